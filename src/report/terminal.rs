use owo_colors::OwoColorize;

use crate::alert::{highest_level, Alert};
use crate::engine::RunOutcome;

fn count_line(label: &str, alerts: &[Alert]) -> String {
    let highest = highest_level(alerts)
        .map(|l| format!(" (Highest: {})", l.title()))
        .unwrap_or_default();
    format!("- {}: {}{}", label, alerts.len(), highest)
}

/// Plain-text summary lines: unfiltered new/fixed counts and, for API
/// comparisons, the matched count.
pub fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let mut lines = vec![
        count_line("New (unfiltered)", outcome.unfiltered_new()),
        count_line("Fixed (unfiltered)", outcome.unfiltered_fixed()),
    ];
    match outcome.matched() {
        Some(matched) => lines.push(count_line("Matched (preexisting)", matched)),
        None => lines.push("- Matched (preexisting): N/A (no API comparison)".to_string()),
    }
    lines
}

/// Print the summary to stdout
pub fn render(outcome: &RunOutcome, tool_label: &str) {
    println!("{}", format!("{} Summary:", tool_label).bold());
    for line in summary_lines(outcome) {
        println!("{}", line);
    }
    println!();
}
