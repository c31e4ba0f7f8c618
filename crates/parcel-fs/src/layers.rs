use tracing::trace;

use crate::error::FsResult;
use crate::traits::Source;

struct Layer {
    priority: i32,
    source: Box<dyn Source>,
}

/// Read-only sources ordered by ascending priority.
///
/// Priority 0 is searched before priority 1. Layers registered with equal
/// priority keep their registration order.
#[derive(Default)]
pub struct Layers {
    layers: Vec<Layer>,
}

impl Layers {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source at `priority`.
    pub fn push(&mut self, source: impl Source + 'static, priority: i32) {
        self.layers.push(Layer {
            priority,
            source: Box::new(source),
        });
        // Stable sort: equal priorities stay in insertion order.
        self.layers.sort_by_key(|layer| layer.priority);
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layer is registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Priorities of the registered layers, in search order.
    pub fn priorities(&self) -> Vec<i32> {
        self.layers.iter().map(|layer| layer.priority).collect()
    }

    /// Read `path` from the first layer that holds it.
    ///
    /// Returns `Ok(None)` if no layer holds the path. An I/O failure in any
    /// layer stops the search and is returned.
    pub fn read(&self, path: &str) -> FsResult<Option<Vec<u8>>> {
        for layer in &self.layers {
            if let Some(bytes) = layer.source.read(path)? {
                trace!(path, priority = layer.priority, "layer hit");
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// Check whether any layer holds `path`.
    pub fn contains(&self, path: &str) -> FsResult<bool> {
        for layer in &self.layers {
            if layer.source.contains(path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every path visible through the stack, sorted and deduplicated.
    pub fn list(&self) -> FsResult<Vec<String>> {
        let mut paths = Vec::new();
        for layer in &self.layers {
            paths.extend(layer.source.list()?);
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layers")
            .field("priorities", &self.priorities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn store_with(path: &str, data: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(path, data).unwrap();
        store
    }

    #[test]
    fn lowest_priority_number_wins() {
        let mut layers = Layers::new();
        layers.push(store_with("doc", "late"), 10);
        layers.push(store_with("doc", "early"), 0);
        assert_eq!(layers.read("doc").unwrap(), Some(b"early".to_vec()));
        assert_eq!(layers.priorities(), vec![0, 10]);
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut layers = Layers::new();
        layers.push(store_with("doc", "first"), 1);
        layers.push(store_with("doc", "second"), 1);
        assert_eq!(layers.read("doc").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn falls_through_to_later_layers() {
        let mut layers = Layers::new();
        layers.push(MemoryStore::new(), 0);
        layers.push(store_with("doc", "found"), 5);
        assert_eq!(layers.read("doc").unwrap(), Some(b"found".to_vec()));
        assert!(layers.contains("doc").unwrap());
    }

    #[test]
    fn missing_everywhere_is_none() {
        let mut layers = Layers::new();
        layers.push(store_with("other", "x"), 0);
        assert!(layers.read("doc").unwrap().is_none());
        assert!(Layers::new().read("doc").unwrap().is_none());
    }

    #[test]
    fn list_merges_layers() {
        let mut layers = Layers::new();
        layers.push(store_with("a", "1"), 0);
        layers.push(store_with("a", "2"), 1);
        layers.push(store_with("b", "3"), 2);
        assert_eq!(layers.list().unwrap(), vec!["a", "b"]);
        assert_eq!(layers.len(), 3);
    }
}
