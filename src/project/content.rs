//! Content providers.
//!
//! A provider maps a source path to its raw text. The engine keeps its own
//! overlay for editor-supplied contents; the provider is only consulted for
//! paths the overlay does not shadow.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Supplies raw text for a source path on demand. May fail (I/O).
///
/// `Send + Sync` so a context can be driven from behind a shared lock.
pub trait ContentProvider: Send + Sync {
    /// Read the current content for `path`.
    fn read(&self, path: &str) -> io::Result<Arc<str>>;

    /// Whether `path` currently has readable content.
    fn exists(&self, path: &str) -> bool;
}

/// Provider backed by the file system.
///
/// Source paths are joined onto an optional root directory; without a root
/// they are used as-is.
#[derive(Debug, Default)]
pub struct FileContentProvider {
    root: Option<PathBuf>,
}

impl FileContentProvider {
    pub fn new() -> FileContentProvider {
        FileContentProvider { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> FileContentProvider {
        FileContentProvider {
            root: Some(root.into()),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }
}

impl ContentProvider for FileContentProvider {
    fn read(&self, path: &str) -> io::Result<Arc<str>> {
        let text = std::fs::read_to_string(self.full_path(path))?;
        Ok(Arc::from(text))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }
}

/// In-memory provider for tests and embedded hosts.
///
/// Clones share the same store, so a handle kept by the host keeps working
/// after another clone is handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentProvider {
    files: Arc<RwLock<FxHashMap<String, Arc<str>>>>,
}

impl MemoryContentProvider {
    pub fn new() -> MemoryContentProvider {
        MemoryContentProvider::default()
    }

    pub fn set(&self, path: impl Into<String>, text: impl Into<Arc<str>>) {
        self.files.write().insert(path.into(), text.into());
    }

    pub fn remove(&self, path: &str) {
        self.files.write().remove(path);
    }
}

impl ContentProvider for MemoryContentProvider {
    fn read(&self, path: &str) -> io::Result<Arc<str>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no content for '{path}'"))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_provider_roundtrip() {
        let provider = MemoryContentProvider::new();
        provider.set("a.lm", "library a;");
        assert!(provider.exists("a.lm"));
        assert_eq!(&*provider.read("a.lm").unwrap(), "library a;");
        provider.remove("a.lm");
        assert!(!provider.exists("a.lm"));
        assert!(provider.read("a.lm").is_err());
    }

    #[test]
    fn test_memory_provider_clones_share_store() {
        let provider = MemoryContentProvider::new();
        let clone = provider.clone();
        provider.set("a.lm", "library a;");
        assert!(clone.exists("a.lm"));
    }

    #[test]
    fn test_file_provider_with_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("app.lm")).unwrap();
        file.write_all(b"library app;").unwrap();

        let provider = FileContentProvider::with_root(dir.path());
        assert!(provider.exists("app.lm"));
        assert_eq!(&*provider.read("app.lm").unwrap(), "library app;");
        assert!(!provider.exists("missing.lm"));
        assert!(provider.read("missing.lm").is_err());
    }
}
