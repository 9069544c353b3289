use serde_json::Value;

use crate::error::Result;
use crate::github::{CodeScanningApi, RepoId};

/// Lazily fetched pages of open alerts.
///
/// Yields one page per call and ends at the first empty page or the first
/// error. There is no cap on the number of pages.
pub struct AlertPages<'a, A: CodeScanningApi + ?Sized> {
    api: &'a A,
    repo: &'a RepoId,
    git_ref: Option<&'a str>,
    next_page: u32,
    done: bool,
}

impl<'a, A: CodeScanningApi + ?Sized> AlertPages<'a, A> {
    pub fn new(api: &'a A, repo: &'a RepoId, git_ref: Option<&'a str>) -> Self {
        AlertPages {
            api,
            repo,
            git_ref,
            next_page: 1,
            done: false,
        }
    }

    /// Drain every page into one list, stopping at the first error.
    pub fn collect_all(self) -> Result<Vec<Value>> {
        let mut alerts = Vec::new();
        for page in self {
            alerts.extend(page?);
        }
        Ok(alerts)
    }
}

impl<A: CodeScanningApi + ?Sized> Iterator for AlertPages<'_, A> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = self.next_page;
        self.next_page += 1;
        match self.api.list_alerts_page(self.repo, self.git_ref, page) {
            Ok(items) if items.is_empty() => {
                self.done = true;
                None
            }
            Ok(items) => Some(Ok(items)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
