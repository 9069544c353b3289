use serde::{Deserialize, Serialize};

/// SARIF result level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    None,
    Note,
    Warning,
    Error,
}

impl Level {
    /// Exact, case-insensitive match on a recognized level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Level::None),
            "note" => Some(Level::Note),
            "warning" => Some(Level::Warning),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    /// Normalize a raw level; missing or unrecognized values become `Warning`.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(Level::parse).unwrap_or(Level::Warning)
    }

    pub fn rank(self) -> u8 {
        match self {
            Level::None => 0,
            Level::Note => 1,
            Level::Warning => 2,
            Level::Error => 3,
        }
    }

    /// True iff this level ranks at or above `threshold`.
    pub fn meets(self, threshold: Level) -> bool {
        self.rank() >= threshold.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::None => "none",
            Level::Note => "note",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    /// Capitalized form used in headings, e.g. "Error"
    pub fn title(&self) -> &'static str {
        match self {
            Level::None => "None",
            Level::Note => "Note",
            Level::Warning => "Warning",
            Level::Error => "Error",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::parse(s).ok_or_else(|| {
            format!("unknown level '{}' (expected none, note, warning or error)", s)
        })
    }
}
