use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::alert::Level;
use crate::github::DEFAULT_API_URL;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify alerts in a SARIF file or directory and render a report
    Check(CheckArgs),

    /// Initialize an .alertdiff.toml config file in the current directory
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// SARIF file, or a directory searched recursively for *.sarif files
    #[arg(long)]
    pub sarif: PathBuf,

    /// Git ref to compare through the Code Scanning API (e.g. refs/pull/104/merge)
    /// when the SARIF has no baseline results
    #[arg(long = "ref")]
    pub git_ref: Option<String>,

    /// Repository owner (organization or user)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// Combined "owner/repo", used when --owner/--repo are not both given
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// API token (falls back to GH_TOKEN)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Lowest SARIF level treated as actionable [default: warning]
    #[arg(long)]
    pub min_level: Option<Level>,

    /// Maximum number of alerts listed per report section [default: 20]
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Diagnostic log file, truncated for every run
    #[arg(long, env = "ALERTDIFF_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Where to write the markdown report
    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Console output: "terminal" summary and report, or the outcome as JSON
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// File receiving key=value step outputs
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,

    /// File receiving the markdown job summary
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    pub step_summary: Option<PathBuf>,

    /// Ignore .alertdiff.toml config files
    #[arg(long)]
    pub no_config: bool,
}
