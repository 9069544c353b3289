mod alert;
mod cli;
mod compare;
mod config;
mod diag;
mod engine;
mod error;
mod github;
mod report;
mod sarif;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alert::Level;
use cli::{CheckArgs, Cli, OutputFormat};
use config::AlertDiffConfig;
use diag::DiagnosticLog;
use engine::{CheckSettings, Reconciler, RunOutcome};
use error::AlertDiffError;
use github::RepoId;
use report::markdown::RenderOptions;
use report::outputs::ActionOutputs;

/// Exit status for configuration, input and API failures
const EXIT_FATAL: i32 = 2;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("alertdiff=debug")
    } else if cli.quiet {
        EnvFilter::new("alertdiff=error")
    } else {
        EnvFilter::new("alertdiff=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        cli::Commands::Check(args) => check(args),
        cli::Commands::Init => {
            let dir = std::env::current_dir()?;
            if config::init_config(&dir)? {
                println!("✅ Created {}", config::CONFIG_FILE);
                println!("   Edit it to customize comparison and report settings.");
            } else {
                println!("⚠️  {} already exists in this directory", config::CONFIG_FILE);
            }
            Ok(0)
        }
    }
}

/// Settings for `check` after merging flags, config file and defaults.
struct Resolved {
    settings: CheckSettings,
    max_results: usize,
    tool_label: String,
    report_path: std::path::PathBuf,
    log_path: std::path::PathBuf,
}

fn resolve(args: &CheckArgs) -> Result<Resolved> {
    let file_config = if args.no_config {
        None
    } else {
        AlertDiffConfig::load(&std::env::current_dir()?)
    };
    let file_config = file_config.unwrap_or_default();

    let min_level = match (args.min_level, file_config.compare.min_level.as_deref()) {
        (Some(level), _) => level,
        (None, Some(raw)) => raw
            .parse::<Level>()
            .map_err(|e| AlertDiffError::Config(format!("{} in {}", e, config::CONFIG_FILE)))?,
        (None, None) => Level::Warning,
    };

    let repo = match (args.owner.as_deref(), args.repo.as_deref()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Some(RepoId::new(owner, repo))
        }
        _ => args.repository.as_deref().and_then(RepoId::parse),
    };

    let token = args
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| std::env::var("GH_TOKEN").ok());

    Ok(Resolved {
        settings: CheckSettings {
            sarif_path: args.sarif.clone(),
            git_ref: args.git_ref.clone().filter(|r| !r.is_empty()),
            min_level,
            repo,
            token,
            api_url: args.api_url.clone(),
        },
        max_results: args
            .max_results
            .or(file_config.compare.max_results)
            .unwrap_or(config::DEFAULT_MAX_RESULTS),
        tool_label: file_config
            .report
            .tool_label
            .unwrap_or_else(|| config::DEFAULT_TOOL_LABEL.to_string()),
        report_path: args
            .report_path
            .clone()
            .or(file_config.report.report_path)
            .unwrap_or_else(config::default_report_path),
        log_path: args
            .log_path
            .clone()
            .or(file_config.log.path)
            .unwrap_or_else(config::default_log_path),
    })
}

fn check(args: &CheckArgs) -> Result<i32> {
    let resolved = resolve(args)?;
    let log = DiagnosticLog::open(&resolved.log_path);
    info!("alertdiff v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match Reconciler::new(&resolved.settings, &log).run() {
        Ok(outcome) => outcome,
        Err(e) => {
            log.record(format!("Run failed: {}", e));
            if e.is_remote() {
                error!("GitHub API error: {}", e);
            }
            return Err(e.into());
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", report::json::render(&outcome)?),
        OutputFormat::Terminal => report::terminal::render(&outcome, &resolved.tool_label),
    }

    let repo_name = resolved.settings.repo.as_ref().map(RepoId::to_string);
    let opts = RenderOptions {
        max_results: resolved.max_results,
        threshold: outcome.applied_threshold(),
        repo: repo_name.as_deref(),
        tool_label: &resolved.tool_label,
    };

    if !outcome.is_reportable() {
        if args.format == OutputFormat::Terminal {
            println!(
                "No new or resolved {} alerts past the configured threshold.",
                resolved.tool_label
            );
        }
        write_outputs(args, &[], &[], None, log.path())?;
        return Ok(0);
    }

    let body = render_report(&outcome, &opts);
    report::outputs::write_report(&resolved.report_path, &body)
        .with_context(|| format!("failed to write report to {}", resolved.report_path.display()))?;
    info!("Report written to {}", resolved.report_path.display());

    if let Some(ref summary_path) = args.step_summary {
        let new = outcome.new_alerts();
        let fixed = outcome.fixed_alerts();
        if !new.is_empty() || !fixed.is_empty() {
            let summary = report::markdown::render_step_summary(new, fixed, &opts);
            report::outputs::append(summary_path, &summary)
                .with_context(|| format!("failed to append to {}", summary_path.display()))?;
        }
    }

    write_outputs(
        args,
        outcome.new_alerts(),
        outcome.fixed_alerts(),
        Some(&resolved.report_path),
        log.path(),
    )?;

    if args.format == OutputFormat::Terminal {
        println!("{}", body);
    }
    Ok(0)
}

fn render_report(outcome: &RunOutcome, opts: &RenderOptions) -> String {
    match outcome.remote() {
        Some(remote) => report::markdown::render_multi_section(remote, opts),
        None => report::markdown::render_report(outcome.new_alerts(), outcome.fixed_alerts(), opts),
    }
}

fn write_outputs(
    args: &CheckArgs,
    new: &[alert::Alert],
    fixed: &[alert::Alert],
    report_path: Option<&std::path::Path>,
    log_path: Option<&std::path::Path>,
) -> Result<()> {
    let Some(ref output_path) = args.github_output else {
        return Ok(());
    };
    let outputs = ActionOutputs {
        new_alerts: new,
        fixed_alerts: fixed,
        report_path,
        log_path,
    };
    report::outputs::append(output_path, &outputs.to_lines())
        .with_context(|| format!("failed to write outputs to {}", output_path.display()))
}
