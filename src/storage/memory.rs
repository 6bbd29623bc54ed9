//! In-Process Storage Module
//!
//! Typed map backend; entries are stored as-is with no serialization.

use std::collections::HashMap;

use super::{KeyOrder, StorageAdapter, StorageKind};

// == Memory Store ==
/// Exclusive in-process store of structured records.
#[derive(Debug)]
pub struct MemoryStore<T> {
    entries: HashMap<String, T>,
    order: KeyOrder,
}

impl<T> MemoryStore<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: KeyOrder::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> StorageAdapter<T> for MemoryStore<T> {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read(&self, key: &str) -> Option<T> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &T, _ttl_hint_ms: Option<i64>) {
        self.entries.insert(key.to_string(), value.clone());
        self.order.track(key);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.order.keys()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_write_and_read() {
        let mut store = MemoryStore::new();
        store.write("a", &1u32, None);

        assert_eq!(store.read("a"), Some(1));
        assert_eq!(store.read("missing"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_keys_in_insertion_order() {
        let mut store = MemoryStore::new();
        store.write("z", &1u32, None);
        store.write("a", &2u32, None);
        store.write("z", &3u32, None);

        assert_eq!(store.keys(), vec!["z", "a"]);
        assert_eq!(store.read("z"), Some(3));
    }

    #[test]
    fn test_memory_remove_and_clear() {
        let mut store = MemoryStore::new();
        store.write("a", &1u32, None);
        store.write("b", &2u32, None);

        store.remove("a");
        assert_eq!(store.keys(), vec!["b"]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }
}
