use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::alert::{Alert, Level};
use crate::compare::{baseline, BaselineBuckets, RemoteComparison, Strategy};
use crate::compare::remote::RemoteComparator;
use crate::diag::DiagnosticLog;
use crate::error::{AlertDiffError, Result};
use crate::github::{CodeScanningApi, GitHubClient, RepoId};
use crate::sarif;

/// Everything one reconciliation needs, already merged from CLI and config.
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub sarif_path: PathBuf,
    pub git_ref: Option<String>,
    pub min_level: Level,
    pub repo: Option<RepoId>,
    pub token: Option<String>,
    pub api_url: String,
}

/// How the run's alerts were classified
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Comparison {
    Baseline {
        /// Buckets after the level threshold
        filtered: BaselineBuckets,
        /// Buckets with every level included, for the console summary
        unfiltered: BaselineBuckets,
    },
    Remote(RemoteComparison),
}

/// Result of one run, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub threshold: Level,
    pub comparison: Comparison,
}

impl RunOutcome {
    pub fn new_alerts(&self) -> &[Alert] {
        match self.comparison {
            Comparison::Baseline { ref filtered, .. } => &filtered.new,
            Comparison::Remote(ref remote) => &remote.new,
        }
    }

    pub fn fixed_alerts(&self) -> &[Alert] {
        match self.comparison {
            Comparison::Baseline { ref filtered, .. } => &filtered.absent,
            Comparison::Remote(ref remote) => &remote.fixed,
        }
    }

    pub fn unfiltered_new(&self) -> &[Alert] {
        match self.comparison {
            Comparison::Baseline { ref unfiltered, .. } => &unfiltered.new,
            Comparison::Remote(ref remote) => &remote.new,
        }
    }

    pub fn unfiltered_fixed(&self) -> &[Alert] {
        match self.comparison {
            Comparison::Baseline { ref unfiltered, .. } => &unfiltered.absent,
            Comparison::Remote(ref remote) => &remote.fixed,
        }
    }

    /// Pre-existing alerts; only known when the API comparison ran.
    pub fn matched(&self) -> Option<&[Alert]> {
        match self.comparison {
            Comparison::Baseline { .. } => None,
            Comparison::Remote(ref remote) => Some(&remote.matched),
        }
    }

    pub fn remote(&self) -> Option<&RemoteComparison> {
        match self.comparison {
            Comparison::Remote(ref remote) => Some(remote),
            Comparison::Baseline { .. } => None,
        }
    }

    /// Level threshold the reported new alerts were filtered by. Alerts from
    /// the API comparison are reported at every level.
    pub fn applied_threshold(&self) -> Option<Level> {
        match self.comparison {
            Comparison::Baseline { .. } => Some(self.threshold),
            Comparison::Remote(_) => None,
        }
    }

    /// True when the run produced anything worth a report.
    pub fn is_reportable(&self) -> bool {
        !self.new_alerts().is_empty()
            || !self.fixed_alerts().is_empty()
            || self.remote().is_some_and(RemoteComparison::has_secondary_changes)
    }
}

/// Drives one run: load SARIF, classify by baseline state, and fall back to
/// the API comparison when that yields nothing and a ref was given.
pub struct Reconciler<'a> {
    settings: &'a CheckSettings,
    log: &'a DiagnosticLog,
}

impl<'a> Reconciler<'a> {
    pub fn new(settings: &'a CheckSettings, log: &'a DiagnosticLog) -> Self {
        Reconciler { settings, log }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.run_with(|token| GitHubClient::new(token, &self.settings.api_url, self.log))
    }

    /// Like [`Reconciler::run`], building the API client with `connect` only
    /// if the remote comparison is needed.
    pub fn run_with<A, F>(&self, connect: F) -> Result<RunOutcome>
    where
        A: CodeScanningApi,
        F: FnOnce(&str) -> Result<A>,
    {
        let document = sarif::load(&self.settings.sarif_path)?;

        let unfiltered = baseline::collect(&document, self.log);
        let filtered = unfiltered.at_threshold(self.settings.min_level);
        self.log.record(format!(
            "SARIF baseline results: new={}, fixed={}",
            filtered.new.len(),
            filtered.absent.len()
        ));

        let comparison = match Strategy::select(&filtered, self.settings.git_ref.as_deref()) {
            Strategy::Baseline => Comparison::Baseline {
                filtered,
                unfiltered,
            },
            Strategy::Remote { git_ref } => {
                self.log
                    .record("No SARIF baselineState results found; switching to API comparison mode");
                let repo = self.settings.repo.as_ref().ok_or_else(|| {
                    AlertDiffError::Config(
                        "repository not set; pass --owner and --repo or --repository owner/repo (GITHUB_REPOSITORY)"
                            .into(),
                    )
                })?;
                let token = self.settings.token.as_deref().filter(|t| !t.is_empty()).ok_or_else(|| {
                    AlertDiffError::Config("set GITHUB_TOKEN (or GH_TOKEN) with appropriate scopes".into())
                })?;
                let api = connect(token)?;
                info!("Querying Code Scanning alerts for {}", repo);
                Comparison::Remote(RemoteComparator::new(&api, repo, self.log).compare(&git_ref)?)
            }
        };

        Ok(RunOutcome {
            threshold: self.settings.min_level,
            comparison,
        })
    }
}
