use anyhow::Result;

use crate::engine::RunOutcome;

/// Render a run outcome as pretty-printed JSON
pub fn render(outcome: &RunOutcome) -> Result<String> {
    let json = serde_json::to_string_pretty(outcome)?;
    Ok(json)
}
