use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{AlertDiffError, Result};

/// Recursively collect `*.sarif` files under `root`, sorted by path.
///
/// - Hidden files and ignore files are not honoured (analysis output often
///   lands in ignored directories)
/// - Symlinks are not followed
pub fn find_sarif_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(root);

    builder
        .standard_filters(false) // hidden, .gitignore, .ignore, parents
        .follow_links(false);

    let mut files = Vec::new();

    for entry in builder.build() {
        match entry {
            Ok(entry) => {
                if !entry.file_type().map_or(false, |ft| ft.is_file()) {
                    continue;
                }

                let path = entry.path();
                if is_sarif(path) {
                    files.push(path.to_path_buf());
                } else {
                    debug!("Not a SARIF file: {}", path.display());
                }
            }
            Err(e) => {
                return Err(AlertDiffError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("failed to walk {}: {}", root.display(), e),
                )));
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_sarif(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("sarif")
}
