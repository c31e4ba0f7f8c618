use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{FsError, FsResult};
use crate::traits::{Sink, Source};

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Clones share the same underlying map,
/// so one store can be registered as both a source and the sink of a parcel
/// context and then handed to a second, fresh context.
#[derive(Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.files.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a file directly, bypassing any parcel context.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> FsResult<()> {
        let mut map = self
            .files
            .write()
            .map_err(|e| FsError::Poisoned(e.to_string()))?;
        map.insert(path.into(), data.into());
        Ok(())
    }

    /// Read a file as UTF-8 text. Convenience for assertions.
    pub fn read_to_string(&self, path: &str) -> Option<String> {
        let map = self.files.read().ok()?;
        map.get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Remove all files from the store.
    pub fn clear(&self) {
        if let Ok(mut map) = self.files.write() {
            map.clear();
        }
    }
}

impl Source for MemoryStore {
    fn read(&self, path: &str) -> FsResult<Option<Vec<u8>>> {
        let map = self
            .files
            .read()
            .map_err(|e| FsError::Poisoned(e.to_string()))?;
        Ok(map.get(path).cloned())
    }

    fn list(&self) -> FsResult<Vec<String>> {
        let map = self
            .files
            .read()
            .map_err(|e| FsError::Poisoned(e.to_string()))?;
        let mut paths: Vec<String> = map.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    fn contains(&self, path: &str) -> FsResult<bool> {
        let map = self
            .files
            .read()
            .map_err(|e| FsError::Poisoned(e.to_string()))?;
        Ok(map.contains_key(path))
    }
}

impl Sink for MemoryStore {
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        self.insert(path, data)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("file_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let store = MemoryStore::new();
        store.write_file("a.parcel", b"hello").unwrap();
        assert_eq!(store.read("a.parcel").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn read_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.read("missing.parcel").unwrap().is_none());
        assert!(!store.contains("missing.parcel").unwrap());
    }

    #[test]
    fn write_replaces_existing_content() {
        let store = MemoryStore::new();
        store.write_file("a", b"first").unwrap();
        store.write_file("a", b"second").unwrap();
        assert_eq!(store.read_to_string("a").as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write_file("shared", b"x").unwrap();
        assert!(other.contains("shared").unwrap());
    }

    #[test]
    fn list_is_sorted() {
        let store = MemoryStore::new();
        store.insert("c", "3").unwrap();
        store.insert("a", "1").unwrap();
        store.insert("b", "2").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_removes_all() {
        let store = MemoryStore::new();
        store.insert("a", "1").unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn debug_format() {
        let store = MemoryStore::new();
        store.insert("x", "1").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("MemoryStore"));
        assert!(debug.contains("file_count"));
    }
}
