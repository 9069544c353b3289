use crate::alert::{highest_level, Alert, Level};
use crate::compare::remote::{RemoteComparison, SecondaryComparison};

const NEW_BULLET: &str = ":x:";
const FIXED_BULLET: &str = ":white_check_mark:";

/// Settings shared by every rendered section
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub max_results: usize,
    /// Level the new alerts were filtered by; `None` when no filter applied
    pub threshold: Option<Level>,
    /// `owner/repo`, used to link the full Code Scanning report
    pub repo: Option<&'a str>,
    /// Analysis tool named in headings, e.g. "CodeQL"
    pub tool_label: &'a str,
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn threshold_note(threshold: Option<Level>) -> String {
    threshold
        .map(|t| format!(" (level ≥ {})", t))
        .unwrap_or_default()
}

fn short_ref(git_ref: &str) -> String {
    git_ref.chars().take(7).collect()
}

/// Render one alert as a markdown bullet.
pub fn format_alert(alert: &Alert, bullet: &str) -> String {
    let prefix = match (alert.number, alert.html_url.as_deref()) {
        (Some(n), Some(url)) => format!("[# {}]({}) ", n, url),
        (Some(n), None) => format!("# {} ", n),
        _ => String::new(),
    };
    let dismissed = alert
        .dismissed_reason
        .as_deref()
        .map(|r| format!(" (dismissed: {})", r))
        .unwrap_or_default();
    format!(
        "- {} **{}**{} {}{}{} at `{}` — {}",
        bullet,
        alert.level.title(),
        alert.severity_suffix(),
        prefix,
        alert.rule_display(),
        dismissed,
        alert.location,
        alert.message
    )
}

/// Bullets for up to `max_results` alerts plus an "…and N more" trailer.
pub fn format_section(alerts: &[Alert], max_results: usize, bullet: &str) -> Vec<String> {
    let shown = alerts.len().min(max_results);
    let mut lines: Vec<String> = alerts[..shown]
        .iter()
        .map(|a| format_alert(a, bullet))
        .collect();
    let remaining = alerts.len().saturating_sub(shown);
    if remaining > 0 {
        lines.push(format!(
            "- {} …and {} more alerts (see Code Scanning for the full list).",
            bullet, remaining
        ));
    }
    lines
}

fn push_section(lines: &mut Vec<String>, heading: String, alerts: &[Alert], max: usize, bullet: &str) {
    lines.push(heading);
    lines.extend(format_section(alerts, max, bullet));
    lines.push(String::new());
}

fn push_primary(lines: &mut Vec<String>, new: &[Alert], fixed: &[Alert], opts: &RenderOptions) {
    if !new.is_empty() {
        let highest = highest_level(new)
            .map(|l| format!(" — Highest severity: {}", l.title()))
            .unwrap_or_default();
        let heading = format!(
            "## ❌ {} new {} alert{}{}{}",
            new.len(),
            opts.tool_label,
            plural(new.len()),
            threshold_note(opts.threshold),
            highest
        );
        push_section(lines, heading, new, opts.max_results, NEW_BULLET);
    }
    if !fixed.is_empty() {
        let heading = format!(
            "## ✅ {} {} alert{} resolved since the previous run",
            fixed.len(),
            opts.tool_label,
            plural(fixed.len())
        );
        push_section(lines, heading, fixed, opts.max_results, FIXED_BULLET);
    }
}

fn push_secondary(
    lines: &mut Vec<String>,
    comparison: &SecondaryComparison,
    since: &str,
    opts: &RenderOptions,
) {
    if !comparison.new.is_empty() {
        let heading = format!(
            "## ❌ {} new {} alert{} since {}",
            comparison.new.len(),
            opts.tool_label,
            plural(comparison.new.len()),
            since
        );
        push_section(lines, heading, &comparison.new, opts.max_results, NEW_BULLET);
    }
    if !comparison.fixed.is_empty() {
        let heading = format!(
            "## ✅ {} {} alert{} resolved since {}",
            comparison.fixed.len(),
            opts.tool_label,
            plural(comparison.fixed.len()),
            since
        );
        push_section(lines, heading, &comparison.fixed, opts.max_results, FIXED_BULLET);
    }
}

fn closing_line(opts: &RenderOptions) -> String {
    match opts.repo {
        Some(repo) => format!(
            "Review the [full {} report](https://github.com/{}/security/code-scanning) for details.",
            opts.tool_label, repo
        ),
        None => format!(
            "Review the {} report in the Security tab for full details.",
            opts.tool_label
        ),
    }
}

fn finish(mut lines: Vec<String>, opts: &RenderOptions) -> String {
    lines.push(closing_line(opts));
    format!("{}\n", lines.join("\n").trim())
}

/// Report for a single (new, fixed) pair.
pub fn render_report(new: &[Alert], fixed: &[Alert], opts: &RenderOptions) -> String {
    let mut lines = Vec::new();
    push_primary(&mut lines, new, fixed, opts);
    finish(lines, opts)
}

/// Report for an API comparison, including the previous-commit and
/// branch-point comparisons when they are available.
pub fn render_multi_section(comparison: &RemoteComparison, opts: &RenderOptions) -> String {
    let mut lines = Vec::new();

    if let Some(ref base) = comparison.vs_branch_point {
        lines.push(format!(
            "{} fixed, {} new since branch point ({})",
            base.fixed.len(),
            base.new.len(),
            short_ref(&base.against)
        ));
    }
    if let Some(ref prev) = comparison.vs_previous_commit {
        lines.push(format!(
            "{} fixed, {} new since previous report on PR ({})",
            prev.fixed.len(),
            prev.new.len(),
            short_ref(&prev.against)
        ));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    push_primary(&mut lines, &comparison.new, &comparison.fixed, opts);
    if let Some(ref prev) = comparison.vs_previous_commit {
        push_secondary(&mut lines, prev, "the previous PR commit", opts);
    }
    if let Some(ref base) = comparison.vs_branch_point {
        push_secondary(&mut lines, base, "the branch point", opts);
    }
    finish(lines, opts)
}

/// Job summary section (`GITHUB_STEP_SUMMARY`)
pub fn render_step_summary(new: &[Alert], fixed: &[Alert], opts: &RenderOptions) -> String {
    let mut out = format!("## {} Alerts\n\n", opts.tool_label);
    if !new.is_empty() {
        out.push_str(&format!(
            "❌ {} new alert{}{}.\n",
            new.len(),
            plural(new.len()),
            threshold_note(opts.threshold)
        ));
        for line in format_section(new, opts.max_results, NEW_BULLET) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    if !fixed.is_empty() {
        out.push_str(&format!(
            "✅ {} alert{} resolved since the previous run.\n",
            fixed.len(),
            plural(fixed.len())
        ));
        for line in format_section(fixed, opts.max_results, FIXED_BULLET) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
