use serde::Serialize;
use serde_json::Value;

use crate::alert::normalize::{from_sarif_result, rule_lookup};
use crate::alert::{Alert, Level};
use crate::diag::DiagnosticLog;
use crate::sarif;

/// Alerts classified by their embedded SARIF `baselineState`, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BaselineBuckets {
    pub new: Vec<Alert>,
    /// Results whose baseline state is `absent`, i.e. fixed
    pub absent: Vec<Alert>,
}

impl BaselineBuckets {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.absent.is_empty()
    }

    /// Buckets actionable at `threshold`.
    ///
    /// Only `new` alerts are filtered; a resolved alert is reported whatever
    /// its former level.
    pub fn at_threshold(&self, threshold: Level) -> BaselineBuckets {
        BaselineBuckets {
            new: self
                .new
                .iter()
                .filter(|a| a.level.meets(threshold))
                .cloned()
                .collect(),
            absent: self.absent.clone(),
        }
    }
}

enum BaselineState {
    New,
    Absent,
}

fn baseline_state(result: &Value) -> Option<BaselineState> {
    let state = result.get("baselineState").and_then(Value::as_str)?;
    if state.eq_ignore_ascii_case("new") {
        Some(BaselineState::New)
    } else if state.eq_ignore_ascii_case("absent") {
        Some(BaselineState::Absent)
    } else {
        None
    }
}

/// Collect `new` and `absent` results from every run of a SARIF document,
/// at every level. Other baseline states are skipped.
pub fn collect(document: &Value, log: &DiagnosticLog) -> BaselineBuckets {
    let mut buckets = BaselineBuckets::default();
    for run in sarif::runs(document) {
        let rules = rule_lookup(run);
        let results = run
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for result in results {
            let Some(state) = baseline_state(result) else {
                continue;
            };
            let alert = from_sarif_result(result, &rules, log);
            match state {
                BaselineState::New => buckets.new.push(alert),
                BaselineState::Absent => buckets.absent.push(alert),
            }
        }
    }
    buckets
}
