pub mod level;
pub mod normalize;

use serde::{Deserialize, Serialize};

pub use level::Level;

pub const RULE_ID_UNAVAILABLE: &str = "(rule id unavailable)";
pub const LOCATION_UNAVAILABLE: &str = "(location unavailable)";
pub const NO_MESSAGE: &str = "(no message provided)";

const MESSAGE_LIMIT: usize = 220;
const TRUNCATED_LEN: usize = MESSAGE_LIMIT - 3;

/// A single normalized code scanning alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert number, only known for alerts fetched from the API
    pub number: Option<u64>,

    /// Link to the alert page
    pub html_url: Option<String>,

    pub rule_id: String,

    pub level: Level,

    /// Sanitized single-line message
    pub message: String,

    /// `path[:line[:col]]`, a logical name, or `(location unavailable)`
    pub location: String,

    pub rule_name: Option<String>,
    pub help_uri: Option<String>,
    pub security_severity: Option<String>,
    pub dismissed_reason: Option<String>,

    /// Opaque fingerprint from the API; preferred identity when present
    pub analysis_key: Option<String>,
}

/// Identity used to decide whether two alerts are the same finding.
///
/// Fingerprint keys order before rule+location keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertKey {
    Fingerprint(String),
    RuleLocation { rule_id: String, location: String },
}

impl AlertKey {
    pub fn is_fingerprint(&self) -> bool {
        matches!(self, AlertKey::Fingerprint(_))
    }
}

impl Alert {
    pub fn key(&self) -> AlertKey {
        match self.analysis_key {
            Some(ref ak) => AlertKey::Fingerprint(ak.clone()),
            None => AlertKey::RuleLocation {
                rule_id: self.rule_id.clone(),
                location: self.location.clone(),
            },
        }
    }

    pub fn has_location(&self) -> bool {
        self.location != LOCATION_UNAVAILABLE
    }

    /// Rule id as markdown, linked when a help URI is known
    pub fn rule_display(&self) -> String {
        match self.help_uri {
            Some(ref uri) => format!("[{}]({})", self.rule_id, uri),
            None => format!("`{}`", self.rule_id),
        }
    }

    pub fn severity_suffix(&self) -> String {
        match self.security_severity {
            Some(ref sev) => format!(" ({})", sev),
            None => String::new(),
        }
    }
}

/// Collapse whitespace to single spaces and cap the length at 220 characters.
pub fn sanitize_message(message: Option<&str>) -> String {
    let flattened = match message {
        Some(m) => m.split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    };
    if flattened.is_empty() {
        return NO_MESSAGE.to_string();
    }
    if flattened.chars().count() > MESSAGE_LIMIT {
        let mut truncated: String = flattened.chars().take(TRUNCATED_LEN).collect();
        truncated.push_str("...");
        return truncated;
    }
    flattened
}

/// Highest level present, if any
pub fn highest_level(alerts: &[Alert]) -> Option<Level> {
    alerts.iter().map(|a| a.level).max()
}

#[cfg(test)]
impl Alert {
    /// Build an alert with only the identity-relevant fields set.
    pub fn new(rule_id: impl Into<String>, level: Level, location: impl Into<String>) -> Self {
        Alert {
            number: None,
            html_url: None,
            rule_id: rule_id.into(),
            level,
            message: NO_MESSAGE.to_string(),
            location: location.into(),
            rule_name: None,
            help_uri: None,
            security_severity: None,
            dismissed_reason: None,
            analysis_key: None,
        }
    }
}
