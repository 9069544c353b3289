use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = ".alertdiff.toml";
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_TOOL_LABEL: &str = "CodeQL";
const LOG_FILE: &str = "codeql-alerts.log";
const REPORT_FILE: &str = "codeql-alerts.md";

/// alertdiff configuration (loaded from .alertdiff.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertDiffConfig {
    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompareConfig {
    /// Lowest level treated as actionable for new alerts
    #[serde(default)]
    pub min_level: Option<String>,

    /// Alerts listed per report section
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportConfig {
    /// Tool name used in headings
    #[serde(default)]
    pub tool_label: Option<String>,

    /// Where the markdown report is written
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// Diagnostic log file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AlertDiffConfig {
    /// Try to load .alertdiff.toml from the given directory or its parents
    pub fn load(start: &Path) -> Option<Self> {
        let config_path = find_config_file(start)?;
        debug!("Found config: {}", config_path.display());

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str::<AlertDiffConfig>(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Could not read {}: {}", config_path.display(), e);
                None
            }
        }
    }
}

/// Walk up from `start` to find .alertdiff.toml
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(CONFIG_FILE);
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Scratch directory for CI artifacts: `$RUNNER_TEMP` when set.
fn runner_temp() -> Option<PathBuf> {
    std::env::var_os("RUNNER_TEMP")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn default_log_path() -> PathBuf {
    runner_temp()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE)
}

pub fn default_report_path() -> PathBuf {
    runner_temp()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(REPORT_FILE)
}

/// Create a default .alertdiff.toml in `dir`. Returns false if one exists.
pub fn init_config(dir: &Path) -> Result<bool> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() {
        return Ok(false);
    }

    let default_config = r#"# alertdiff configuration

[compare]
# Lowest level treated as actionable for new alerts: "none", "note", "warning", "error"
min_level = "warning"

# Alerts listed per report section before collapsing into "...and N more"
max_results = 20

[report]
# Analysis tool named in report headings
tool_label = "CodeQL"

# Where the markdown report is written. Default: $RUNNER_TEMP/codeql-alerts.md
# report_path = "codeql-alerts.md"

[log]
# Diagnostic log, truncated at the start of every run.
# Default: $RUNNER_TEMP/codeql-alerts.log
# path = "codeql-alerts.log"
"#;

    std::fs::write(&config_path, default_config)?;
    Ok(true)
}
