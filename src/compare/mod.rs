pub mod baseline;
pub mod remote;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::alert::{Alert, AlertKey};

pub use baseline::BaselineBuckets;
pub use remote::RemoteComparison;

/// Alerts from one source, keyed by identity. Later duplicates overwrite.
#[derive(Debug, Clone, Default)]
pub struct AlertSet {
    alerts: BTreeMap<AlertKey, Alert>,
}

impl AlertSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alert: Alert) {
        self.alerts.insert(alert.key(), alert);
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn contains(&self, key: &AlertKey) -> bool {
        self.alerts.contains_key(key)
    }

    pub fn stats(&self) -> KeyStats {
        KeyStats::from_keys(self.alerts.keys())
    }

    /// Diff this set (the subject) against `other` (the comparison side).
    ///
    /// New and matched alerts come from `self`, fixed alerts from `other`;
    /// every list is sorted by identity key.
    pub fn diff(&self, other: &AlertSet) -> Diff {
        let mut diff = Diff::default();
        for (key, alert) in &self.alerts {
            if other.contains(key) {
                diff.matched.push(alert.clone());
            } else {
                diff.new.push(alert.clone());
            }
        }
        diff.fixed = other
            .alerts
            .iter()
            .filter(|(key, _)| !self.contains(key))
            .map(|(_, alert)| alert.clone())
            .collect();
        diff
    }
}

impl FromIterator<Alert> for AlertSet {
    fn from_iter<I: IntoIterator<Item = Alert>>(iter: I) -> Self {
        let mut set = AlertSet::new();
        for alert in iter {
            set.insert(alert);
        }
        set
    }
}

/// Outcome of diffing two alert sets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub new: Vec<Alert>,
    pub fixed: Vec<Alert>,
    pub matched: Vec<Alert>,
}

impl Diff {
    pub fn matched_stats(&self) -> KeyStats {
        let keys: Vec<AlertKey> = self.matched.iter().map(Alert::key).collect();
        KeyStats::from_keys(keys.iter())
    }
}

/// How many keys in a set are fingerprints vs rule+location pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStats {
    pub total: usize,
    pub by_fingerprint: usize,
    pub by_rule_location: usize,
}

impl KeyStats {
    fn from_keys<'a>(keys: impl Iterator<Item = &'a AlertKey>) -> Self {
        let mut stats = KeyStats::default();
        for key in keys {
            stats.total += 1;
            if key.is_fingerprint() {
                stats.by_fingerprint += 1;
            } else {
                stats.by_rule_location += 1;
            }
        }
        stats
    }
}

impl std::fmt::Display for KeyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={}, by_fingerprint={}, by_rule_location={}",
            self.total, self.by_fingerprint, self.by_rule_location
        )
    }
}

/// Which comparison produced the run's alerts.
///
/// Chosen once per run from the data at hand: SARIF baseline states win; the
/// API is consulted only when they classify nothing and a ref was supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Baseline,
    Remote { git_ref: String },
}

impl Strategy {
    pub fn select(buckets: &BaselineBuckets, git_ref: Option<&str>) -> Self {
        match git_ref {
            Some(r) if buckets.is_empty() && !r.is_empty() => Strategy::Remote {
                git_ref: r.to_string(),
            },
            _ => Strategy::Baseline,
        }
    }
}
