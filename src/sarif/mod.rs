pub mod walker;

use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{AlertDiffError, Result};

const DEFAULT_VERSION: &str = "2.1.0";

/// Load a SARIF document from a file, or merge every `*.sarif` under a directory.
///
/// Merging concatenates the runs of each document in path order and keeps the
/// `version` and `$schema` of the first document.
pub fn load(path: &Path) -> Result<Value> {
    if path.is_dir() {
        let files = walker::find_sarif_files(path)?;
        if files.is_empty() {
            return Err(AlertDiffError::NotFound(format!(
                "No SARIF files found under directory: {}",
                path.display()
            )));
        }
        info!("Merging {} SARIF files from {}", files.len(), path.display());
        let documents = files
            .iter()
            .map(|f| load_file(f))
            .collect::<Result<Vec<_>>>()?;
        return Ok(merge(&documents));
    }
    load_file(path)
}

fn load_file(path: &Path) -> Result<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AlertDiffError::NotFound(format!(
                "SARIF file not found: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    debug!("Read {} bytes from {}", text.len(), path.display());
    serde_json::from_str(&text).map_err(|source| AlertDiffError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(documents: &[Value]) -> Value {
    let runs: Vec<Value> = documents.iter().flat_map(|d| runs(d).iter().cloned()).collect();
    let base = documents.first();
    let version = base
        .and_then(|d| d.get("version"))
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_VERSION));
    let schema = base
        .and_then(|d| d.get("$schema"))
        .cloned()
        .unwrap_or(Value::Null);
    json!({
        "version": version,
        "$schema": schema,
        "runs": runs,
    })
}

/// Runs of a document; an absent or malformed `runs` yields none.
pub fn runs(document: &Value) -> &[Value] {
    document
        .get("runs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn doc(tool: &str, schema: &str) -> String {
        json!({
            "version": "2.1.0",
            "$schema": schema,
            "runs": [{"tool": {"driver": {"name": tool}}, "results": []}]
        })
        .to_string()
    }

    #[test]
    fn loads_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.sarif");
        fs::write(&path, doc("codeql", "s1")).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(runs(&loaded).len(), 1);
    }

    #[test]
    fn merges_directory_runs_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.sarif"), doc("second", "schema-b")).unwrap();
        fs::write(dir.path().join("a.sarif"), doc("first", "schema-a")).unwrap();

        let merged = load(dir.path()).unwrap();
        let runs = runs(&merged);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0]["tool"]["driver"]["name"], "first");
        assert_eq!(runs[1]["tool"]["driver"]["name"], "second");
        assert_eq!(merged["$schema"], "schema-a");
        assert_eq!(merged["version"], "2.1.0");
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.sarif")).unwrap_err();
        assert!(matches!(err, AlertDiffError::NotFound(_)));
    }

    #[test]
    fn empty_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, AlertDiffError::NotFound(_)));
    }

    #[test]
    fn one_bad_file_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sarif"), doc("ok", "s")).unwrap();
        fs::write(dir.path().join("b.sarif"), "{not json").unwrap();
        let err = load(dir.path()).unwrap_err();
        match err {
            AlertDiffError::Parse { path, .. } => assert!(path.ends_with("b.sarif")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn documents_without_runs_merge_cleanly() {
        let merged = merge(&[json!({}), json!({"runs": [{"results": []}]})]);
        assert_eq!(runs(&merged).len(), 1);
        assert_eq!(merged["version"], "2.1.0");
    }
}
