pub mod commands;

use clap::Parser;

pub use commands::{CheckArgs, Commands, OutputFormat};

/// alertdiff: reconcile code scanning alerts across revisions
///
/// Classifies SARIF findings as new, fixed or unchanged, either from the
/// SARIF baseline state or by diffing Code Scanning alerts between refs.
#[derive(Parser, Debug)]
#[command(
    name = "alertdiff",
    version,
    about = "Reconcile SARIF code scanning alerts across revisions",
    long_about = "alertdiff reports code scanning alerts introduced or resolved by a change.\nIt reads SARIF baseline states first and falls back to the GitHub Code Scanning API\nwhen a ref is given and the SARIF carries no baseline information."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output (echoes diagnostic log records to stderr)
    #[arg(short, long, global = true, visible_alias = "debug")]
    pub verbose: bool,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
