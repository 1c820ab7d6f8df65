//! Workspace scanning.
//!
//! Collects the analyzable files under a directory so a host can seed a
//! change set for a whole workspace in one batch. Paths are returned
//! relative to the scanned root with `/` separators, matching the engine's
//! URI-like source paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure while walking a workspace directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Recursively collect the `.lm` and `.lmx` files under `root`, relative to
/// it, in a stable sorted order.
pub fn collect_source_paths(root: &Path) -> Result<Vec<String>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let mut paths = Vec::new();
    collect_into(root, root, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn collect_into(root: &Path, dir: &Path, paths: &mut Vec<String>) -> Result<(), ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ScanError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_into(root, &path, paths)?;
        } else if is_source_file(&path) {
            if let Ok(relative) = path.strip_prefix(root) {
                paths.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("lm") | Some("lmx")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.lm"), "library b;").unwrap();
        fs::write(dir.path().join("a.lmx"), "<page/>").unwrap();
        fs::write(dir.path().join("sub/c.lm"), "part of b;").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = collect_source_paths(dir.path()).unwrap();
        assert_eq!(paths, vec!["a.lmx", "b.lm", "sub/c.lm"]);
    }

    #[test]
    fn test_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.lm");
        fs::write(&file, "library x;").unwrap();
        assert!(matches!(
            collect_source_paths(&file),
            Err(ScanError::NotADirectory(_))
        ));
    }
}
