pub mod pages;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::diag::DiagnosticLog;
use crate::error::{AlertDiffError, Result};

pub use pages::AlertPages;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: u32 = 100;

/// Repository identity (`owner/repo`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse a combined `owner/repo` string, splitting on the first `/`.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(RepoId::new(owner, repo))
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The Code Scanning and pull-request calls the remote comparison relies on.
pub trait CodeScanningApi {
    /// One page (1-based) of open alerts for `git_ref`, or the default branch when `None`.
    fn list_alerts_page(&self, repo: &RepoId, git_ref: Option<&str>, page: u32) -> Result<Vec<Value>>;

    /// Raw pull-request object.
    fn pull_request(&self, repo: &RepoId, number: u64) -> Result<Value>;

    /// One page (1-based) of the pull request's commits, oldest first.
    fn pull_request_commits(&self, repo: &RepoId, number: u64, page: u32) -> Result<Value>;
}

/// Blocking GitHub REST client
pub struct GitHubClient<'a> {
    http: HttpClient,
    api_url: String,
    log: &'a DiagnosticLog,
}

impl<'a> GitHubClient<'a> {
    pub fn new(token: &str, api_url: &str, log: &'a DiagnosticLog) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AlertDiffError::Config("GitHub token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("alertdiff/", env!("CARGO_PKG_VERSION"))),
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()?;

        Ok(GitHubClient {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            log,
        })
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.api_url, path);
        self.log.record(format!("GitHub API request: GET {} {:?}", url, query));

        let response = self.http.get(&url).query(query).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            self.log.record(format!("GitHub API HTTP {} for {}: {}", status.as_u16(), url, snippet));
            return Err(AlertDiffError::RemoteApi {
                method: "GET".into(),
                url,
                status: status.as_u16(),
                body,
            });
        }

        self.log.record(format!("GitHub API response: GET {} (len={})", url, body.len()));
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            AlertDiffError::UnexpectedResponse(format!("invalid JSON from {}: {}", url, e))
        })
    }
}

impl CodeScanningApi for GitHubClient<'_> {
    fn list_alerts_page(&self, repo: &RepoId, git_ref: Option<&str>, page: u32) -> Result<Vec<Value>> {
        let mut query = vec![
            ("state", "open".to_string()),
            ("per_page", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(r) = git_ref {
            query.push(("ref", r.to_string()));
        }
        let path = format!("/repos/{}/{}/code-scanning/alerts", repo.owner, repo.repo);
        match self.get_json(&path, &query)? {
            Value::Array(items) => {
                debug!("Page {} for {}: {} alerts", page, git_ref.unwrap_or("(default)"), items.len());
                Ok(items)
            }
            _ => Err(AlertDiffError::UnexpectedResponse(
                "Unexpected response when listing alerts (expected list).".into(),
            )),
        }
    }

    fn pull_request(&self, repo: &RepoId, number: u64) -> Result<Value> {
        self.get_json(&format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number), &[])
    }

    fn pull_request_commits(&self, repo: &RepoId, number: u64, page: u32) -> Result<Value> {
        self.get_json(
            &format!("/repos/{}/{}/pulls/{}/commits", repo.owner, repo.repo, number),
            &[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())],
        )
    }
}
