use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alert::normalize::from_api_alert;
use crate::alert::Alert;
use crate::compare::AlertSet;
use crate::diag::DiagnosticLog;
use crate::error::{AlertDiffError, Result};
use crate::github::{AlertPages, CodeScanningApi, RepoId};

/// Diff of the subject ref against one secondary ref
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryComparison {
    /// Ref the subject was compared against
    pub against: String,
    pub new: Vec<Alert>,
    pub fixed: Vec<Alert>,
}

impl SecondaryComparison {
    pub fn has_changes(&self) -> bool {
        !self.new.is_empty() || !self.fixed.is_empty()
    }
}

/// Result of comparing a ref against the default branch through the API
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemoteComparison {
    pub new: Vec<Alert>,
    pub fixed: Vec<Alert>,
    pub matched: Vec<Alert>,
    pub vs_previous_commit: Option<SecondaryComparison>,
    pub vs_branch_point: Option<SecondaryComparison>,
    pub base_sha: Option<String>,
    pub previous_commit_ref: Option<String>,
}

impl RemoteComparison {
    pub fn has_secondary_changes(&self) -> bool {
        self.vs_previous_commit
            .as_ref()
            .is_some_and(SecondaryComparison::has_changes)
            || self
                .vs_branch_point
                .as_ref()
                .is_some_and(SecondaryComparison::has_changes)
    }
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    base: PullBase,
}

#[derive(Debug, Deserialize)]
struct PullBase {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullCommit {
    sha: String,
}

/// Refs resolved from pull-request metadata; each is optional.
#[derive(Debug, Default)]
struct PullRefs {
    base_ref: Option<String>,
    base_sha: Option<String>,
    previous_commit: Option<String>,
}

fn parse_metadata<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AlertDiffError::UnexpectedResponse(e.to_string()))
}

fn pull_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^refs/pull/([^/]+)(/|$)").unwrap())
}

/// Compares alert sets fetched from the Code Scanning API.
pub struct RemoteComparator<'a, A: CodeScanningApi + ?Sized> {
    api: &'a A,
    repo: &'a RepoId,
    log: &'a DiagnosticLog,
}

impl<'a, A: CodeScanningApi + ?Sized> RemoteComparator<'a, A> {
    pub fn new(api: &'a A, repo: &'a RepoId, log: &'a DiagnosticLog) -> Self {
        RemoteComparator { api, repo, log }
    }

    /// Compare `git_ref` against the default branch, and for pull-request refs
    /// also against the previous PR commit and the PR base.
    ///
    /// Failures fetching the two primary sets are returned; anything going
    /// wrong with the secondary comparisons only drops them.
    pub fn compare(&self, git_ref: &str) -> Result<RemoteComparison> {
        info!("Comparing {} against the default branch via the API", git_ref);
        let subject = self.fetch_set(Some(git_ref), &format!("ref={}", git_ref))?;
        let default_branch = self.fetch_set(None, "default branch")?;

        let primary = subject.diff(&default_branch);
        self.log.record(format!("Matched: {}", primary.matched_stats()));

        let refs = self.pull_refs(git_ref);

        let vs_previous_commit = refs
            .previous_commit
            .as_deref()
            .and_then(|sha| self.secondary(&subject, sha, "previous commit"));

        let base_target = refs.base_sha.as_deref().or(refs.base_ref.as_deref());
        let vs_branch_point =
            base_target.and_then(|target| self.secondary(&subject, target, "base"));

        Ok(RemoteComparison {
            new: primary.new,
            fixed: primary.fixed,
            matched: primary.matched,
            vs_previous_commit,
            vs_branch_point,
            base_sha: refs.base_sha,
            previous_commit_ref: refs.previous_commit,
        })
    }

    fn fetch_set(&self, git_ref: Option<&str>, label: &str) -> Result<AlertSet> {
        let raw = AlertPages::new(self.api, self.repo, git_ref).collect_all()?;
        let set: AlertSet = raw.iter().map(|r| from_api_alert(r, self.log)).collect();
        self.log.record(format!(
            "Fetched {} alerts for {} ({} distinct)",
            raw.len(),
            label,
            set.len()
        ));
        self.log.record(format!("Alerts for {}: {}", label, set.stats()));
        Ok(set)
    }

    fn secondary(&self, subject: &AlertSet, target: &str, label: &str) -> Option<SecondaryComparison> {
        let other = match self.fetch_set(Some(target), &format!("{} {}", label, target)) {
            Ok(set) => set,
            Err(e) => {
                self.log.record(format!("Skipping comparison against {} {}: {}", label, target, e));
                return None;
            }
        };
        if other.is_empty() {
            self.log.record(format!(
                "No alerts recorded for {} {}; skipping comparison",
                label, target
            ));
            return None;
        }
        let diff = subject.diff(&other);
        Some(SecondaryComparison {
            against: target.to_string(),
            new: diff.new,
            fixed: diff.fixed,
        })
    }

    /// Every commit of a pull request, reading pages until an empty one.
    fn pull_commits(&self, number: u64) -> Result<Vec<PullCommit>> {
        let mut commits = Vec::new();
        for page in 1.. {
            let batch = parse_metadata::<Vec<PullCommit>>(
                self.api.pull_request_commits(self.repo, number, page)?,
            )?;
            if batch.is_empty() {
                break;
            }
            commits.extend(batch);
        }
        self.log
            .record(format!("PR #{} lists {} commit(s)", number, commits.len()));
        Ok(commits)
    }

    /// Resolve the PR base and previous commit for `refs/pull/<n>/...` refs.
    fn pull_refs(&self, git_ref: &str) -> PullRefs {
        let mut refs = PullRefs::default();
        if !git_ref.starts_with("refs/pull/") {
            return refs;
        }
        let number = pull_ref_pattern()
            .captures(git_ref)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok());
        let Some(number) = number else {
            self.log.record(format!(
                "Could not determine PR base/previous commit for ref {}: malformed pull request ref",
                git_ref
            ));
            return refs;
        };

        match self
            .api
            .pull_request(self.repo, number)
            .and_then(|v| parse_metadata::<PullRequest>(v))
        {
            Ok(pr) => {
                refs.base_ref = pr.base.git_ref.filter(|s| !s.is_empty());
                refs.base_sha = pr.base.sha.filter(|s| !s.is_empty());
            }
            Err(e) => self.log.record(format!(
                "Could not determine PR base for ref {}: {}",
                git_ref, e
            )),
        }

        match self.pull_commits(number) {
            Ok(commits) if commits.len() >= 2 => {
                refs.previous_commit = Some(commits[commits.len() - 2].sha.clone());
            }
            Ok(commits) => self.log.record(format!(
                "PR #{} has {} commit(s); no previous commit to compare",
                number,
                commits.len()
            )),
            Err(e) => self.log.record(format!(
                "Could not determine previous commit for ref {}: {}",
                git_ref, e
            )),
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::tests::MemorySink;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// In-memory Code Scanning API keyed by ref ("" for the default branch).
    #[derive(Default)]
    struct FakeApi {
        alerts: HashMap<String, Vec<Value>>,
        failing_refs: Vec<String>,
        pull: Option<Value>,
        /// Pages of the PR commit listing; `None` makes the call fail
        commits: Option<Vec<Value>>,
        page_size: usize,
    }

    impl FakeApi {
        fn new() -> Self {
            FakeApi {
                page_size: 2,
                ..Default::default()
            }
        }

        fn with_alerts(mut self, git_ref: &str, keys: &[&str]) -> Self {
            let items = keys.iter().map(|k| api_alert(k)).collect();
            self.alerts.insert(git_ref.to_string(), items);
            self
        }
    }

    impl CodeScanningApi for FakeApi {
        fn list_alerts_page(&self, _repo: &RepoId, git_ref: Option<&str>, page: u32) -> Result<Vec<Value>> {
            let key = git_ref.unwrap_or("");
            if self.failing_refs.iter().any(|r| r == key) {
                return Err(AlertDiffError::RemoteApi {
                    method: "GET".into(),
                    url: format!("/alerts?ref={}", key),
                    status: 500,
                    body: "server error".into(),
                });
            }
            let all = self.alerts.get(key).cloned().unwrap_or_default();
            let start = (page as usize - 1) * self.page_size;
            Ok(all.into_iter().skip(start).take(self.page_size).collect())
        }

        fn pull_request(&self, _repo: &RepoId, _number: u64) -> Result<Value> {
            self.pull
                .clone()
                .ok_or_else(|| AlertDiffError::UnexpectedResponse("no pull".into()))
        }

        fn pull_request_commits(&self, _repo: &RepoId, _number: u64, page: u32) -> Result<Value> {
            let pages = self
                .commits
                .as_ref()
                .ok_or_else(|| AlertDiffError::UnexpectedResponse("no commits".into()))?;
            Ok(pages.get(page as usize - 1).cloned().unwrap_or_else(|| json!([])))
        }
    }

    fn api_alert(key: &str) -> Value {
        json!({
            "number": 1,
            "rule": {"id": format!("rule-{}", key)},
            "most_recent_instance": {
                "analysis_key": key,
                "location": {"path": "src/lib.c", "start_line": 1}
            }
        })
    }

    fn keys(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().filter_map(|a| a.analysis_key.as_deref()).collect()
    }

    fn run(api: &FakeApi, git_ref: &str) -> Result<RemoteComparison> {
        let repo = RepoId::new("octo", "widgets");
        let log = DiagnosticLog::disabled();
        RemoteComparator::new(api, &repo, &log).compare(git_ref)
    }

    #[test]
    fn primary_comparison_against_default_branch() {
        let api = FakeApi::new()
            .with_alerts("refs/heads/feature", &["K2", "K1"])
            .with_alerts("", &["K3", "K2"]);
        let comparison = run(&api, "refs/heads/feature").unwrap();
        assert_eq!(keys(&comparison.new), vec!["K1"]);
        assert_eq!(keys(&comparison.fixed), vec!["K3"]);
        assert_eq!(keys(&comparison.matched), vec!["K2"]);
        assert!(comparison.vs_previous_commit.is_none());
        assert!(comparison.vs_branch_point.is_none());
    }

    #[test]
    fn results_are_sorted_across_pages() {
        let api = FakeApi::new()
            .with_alerts("refs/heads/x", &["e", "c", "a", "d", "b"])
            .with_alerts("", &[]);
        let comparison = run(&api, "refs/heads/x").unwrap();
        assert_eq!(keys(&comparison.new), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn pull_request_adds_secondary_comparisons() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/7/merge", &["K1", "K2", "K4"])
            .with_alerts("", &["K2"])
            .with_alerts("prevsha", &["K1", "K5"])
            .with_alerts("basesha", &["K2", "K6"]);
        api.pull = Some(json!({"base": {"ref": "main", "sha": "basesha"}}));
        api.commits = Some(vec![json!([{"sha": "first"}, {"sha": "prevsha"}, {"sha": "head"}])]);

        let comparison = run(&api, "refs/pull/7/merge").unwrap();
        assert_eq!(comparison.base_sha.as_deref(), Some("basesha"));
        assert_eq!(comparison.previous_commit_ref.as_deref(), Some("prevsha"));

        let prev = comparison.vs_previous_commit.unwrap();
        assert_eq!(prev.against, "prevsha");
        assert_eq!(keys(&prev.new), vec!["K2", "K4"]);
        assert_eq!(keys(&prev.fixed), vec!["K5"]);

        let base = comparison.vs_branch_point.unwrap();
        assert_eq!(keys(&base.new), vec!["K1", "K4"]);
        assert_eq!(keys(&base.fixed), vec!["K6"]);
    }

    #[test]
    fn previous_commit_read_across_commit_pages() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/7/merge", &["K1"])
            .with_alerts("", &[])
            .with_alerts("c4", &["K2"]);
        api.pull = Some(json!({"base": {}}));
        api.commits = Some(vec![
            json!([{"sha": "c1"}, {"sha": "c2"}, {"sha": "c3"}]),
            json!([{"sha": "c4"}, {"sha": "c5"}]),
        ]);

        let comparison = run(&api, "refs/pull/7/merge").unwrap();
        assert_eq!(comparison.previous_commit_ref.as_deref(), Some("c4"));
        let prev = comparison.vs_previous_commit.unwrap();
        assert_eq!(keys(&prev.new), vec!["K1"]);
        assert_eq!(keys(&prev.fixed), vec!["K2"]);
    }

    #[test]
    fn base_ref_used_when_sha_missing() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/3/head", &["K1"])
            .with_alerts("", &[])
            .with_alerts("main", &["K9"]);
        api.pull = Some(json!({"base": {"ref": "main"}}));
        api.commits = Some(vec![json!([{"sha": "only"}])]);

        let comparison = run(&api, "refs/pull/3/head").unwrap();
        assert!(comparison.vs_previous_commit.is_none());
        assert!(comparison.previous_commit_ref.is_none());
        assert_eq!(comparison.vs_branch_point.unwrap().against, "main");
        assert!(comparison.base_sha.is_none());
    }

    #[test]
    fn metadata_failures_degrade() {
        let api = FakeApi::new()
            .with_alerts("refs/pull/9/merge", &["K1"])
            .with_alerts("", &["K1"]);
        let comparison = run(&api, "refs/pull/9/merge").unwrap();
        assert!(comparison.vs_previous_commit.is_none());
        assert!(comparison.vs_branch_point.is_none());
        assert_eq!(keys(&comparison.matched), vec!["K1"]);
    }

    #[test]
    fn unexpected_metadata_shape_degrades() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/9/merge", &["K1"])
            .with_alerts("", &[]);
        api.pull = Some(json!({"title": "no base here"}));
        api.commits = Some(vec![json!({"message": "not a list"})]);

        let repo = RepoId::new("o", "r");
        let sink = MemorySink::default();
        let log = DiagnosticLog::with_sink(Box::new(sink.clone()));
        let comparison = RemoteComparator::new(&api, &repo, &log)
            .compare("refs/pull/9/merge")
            .unwrap();
        assert!(comparison.vs_branch_point.is_none());
        assert!(comparison.vs_previous_commit.is_none());
        let lines = sink.lines.borrow();
        assert!(lines.iter().any(|l| l.contains("Could not determine PR base")));
        assert!(lines.iter().any(|l| l.contains("Could not determine previous commit")));
    }

    #[test]
    fn malformed_pull_ref_skips_metadata() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/abc/merge", &["K1"])
            .with_alerts("", &[]);
        api.pull = Some(json!({"base": {"sha": "basesha"}}));
        let comparison = run(&api, "refs/pull/abc/merge").unwrap();
        assert!(comparison.base_sha.is_none());
    }

    #[test]
    fn secondary_fetch_failure_degrades() {
        let mut api = FakeApi::new()
            .with_alerts("refs/pull/7/merge", &["K1"])
            .with_alerts("", &[]);
        api.pull = Some(json!({"base": {"ref": "main", "sha": "basesha"}}));
        api.commits = Some(vec![json!([{"sha": "a"}, {"sha": "b"}])]);
        api.failing_refs = vec!["basesha".into()];

        let comparison = run(&api, "refs/pull/7/merge").unwrap();
        assert!(comparison.vs_branch_point.is_none());
        assert_eq!(comparison.base_sha.as_deref(), Some("basesha"));
        // "a" has no recorded alerts
        assert!(comparison.vs_previous_commit.is_none());
    }

    #[test]
    fn primary_fetch_failure_is_fatal() {
        let mut api = FakeApi::new().with_alerts("refs/heads/x", &["K1"]);
        api.failing_refs = vec!["".into()];
        let err = run(&api, "refs/heads/x").unwrap_err();
        assert!(err.is_remote());
    }

    #[test]
    fn secondary_changes_flag() {
        let mut comparison = RemoteComparison::default();
        assert!(!comparison.has_secondary_changes());
        comparison.vs_branch_point = Some(SecondaryComparison {
            against: "main".into(),
            new: vec![],
            fixed: vec![Alert::new("R", crate::alert::Level::Note, "x")],
        });
        assert!(comparison.has_secondary_changes());
    }
}
