use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a run. Degraded lookups never surface here.
#[derive(Error, Debug)]
pub enum AlertDiffError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse SARIF JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("GitHub API {method} {url} failed with {status}: {body}")]
    RemoteApi {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected GitHub API response: {0}")]
    UnexpectedResponse(String),

    #[error("failed to make HTTP request: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlertDiffError {
    /// True for failures of a remote call, as opposed to local input problems.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AlertDiffError::RemoteApi { .. }
                | AlertDiffError::UnexpectedResponse(_)
                | AlertDiffError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AlertDiffError>;
