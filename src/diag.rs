use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Destination for diagnostic lines.
pub trait LogSink {
    /// Append one already-formatted line.
    fn append_line(&self, line: &str) -> std::io::Result<()>;
}

/// Appends to a file that was truncated when the run started.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create parent directories and truncate the file with a header line.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::File::create(path)?;
        writeln!(
            file,
            "{} alertdiff log (truncated for new run)",
            chrono::Utc::now().to_rfc3339()
        )?;
        Ok(FileSink {
            path: path.to_path_buf(),
        })
    }
}

impl LogSink for FileSink {
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

/// Best-effort diagnostic log shared by one run.
///
/// Every record is echoed at debug level through `tracing`; writing to the
/// sink never fails the caller.
pub struct DiagnosticLog {
    sink: Option<Box<dyn LogSink>>,
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    /// A log that only echoes through `tracing`.
    pub fn disabled() -> Self {
        DiagnosticLog {
            sink: None,
            path: None,
        }
    }

    /// Open the diagnostic file, falling back to a disabled log on failure.
    pub fn open(path: &Path) -> Self {
        match FileSink::create(path) {
            Ok(sink) => DiagnosticLog {
                path: Some(path.to_path_buf()),
                ..DiagnosticLog::with_sink(Box::new(sink))
            },
            Err(e) => {
                tracing::warn!("Could not open diagnostic log {}: {}", path.display(), e);
                DiagnosticLog::disabled()
            }
        }
    }

    pub fn with_sink(sink: Box<dyn LogSink>) -> Self {
        DiagnosticLog {
            sink: Some(sink),
            path: None,
        }
    }

    /// Path of the backing file, if one was opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        debug!("{}", msg);
        self.append(msg);
    }

    /// Write to the sink only, without the console echo.
    pub fn append(&self, msg: &str) {
        if let Some(ref sink) = self.sink {
            let line = format!("{} {}", chrono::Utc::now().to_rfc3339(), msg);
            let _ = sink.append_line(&line);
        }
    }

    /// Record a JSON snippet, capped at 4000 characters.
    pub fn record_snippet(&self, label: &str, snippet: &serde_json::Value) {
        let text: String = snippet.to_string().chars().take(4000).collect();
        self.append(&format!("{}: {}", label, text));
    }
}
