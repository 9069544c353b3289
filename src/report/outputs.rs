use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::alert::Alert;

/// Values exposed to later workflow steps
#[derive(Debug, Clone)]
pub struct ActionOutputs<'a> {
    pub new_alerts: &'a [Alert],
    pub fixed_alerts: &'a [Alert],
    pub report_path: Option<&'a Path>,
    pub log_path: Option<&'a Path>,
}

impl ActionOutputs<'_> {
    /// `key=value` lines in the format of a `GITHUB_OUTPUT` file.
    pub fn to_lines(&self) -> String {
        let path_or_empty = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();
        format!(
            "new_alerts={}\nalert_count={}\nfixed_alerts={}\nfixed_count={}\ncomment_path={}\nlog_path={}\n",
            !self.new_alerts.is_empty(),
            self.new_alerts.len(),
            !self.fixed_alerts.is_empty(),
            self.fixed_alerts.len(),
            path_or_empty(self.report_path),
            path_or_empty(self.log_path),
        )
    }
}

/// Append `content` to a file, creating it if needed.
pub fn append(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())
}

/// Write the rendered report, creating parent directories.
pub fn write_report(path: &Path, body: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, body)
}
