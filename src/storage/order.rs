//! Key Order Module
//!
//! Tracks insertion order of keys for the in-process backend.

use std::collections::{BTreeMap, HashMap};

// == Key Order ==
/// Records the order in which keys were first inserted.
///
/// Overwriting an existing key keeps its original position. Each key gets a
/// monotonically increasing sequence number, so tracking and removal stay
/// logarithmic no matter how many keys are live.
#[derive(Debug, Default, Clone)]
pub struct KeyOrder {
    /// Key -> sequence number
    index: HashMap<String, u64>,
    /// Sequence number -> key, oldest first
    order: BTreeMap<u64, String>,
    next: u64,
}

impl KeyOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Appends a key if it is not already tracked.
    pub fn track(&mut self, key: &str) {
        if self.index.contains_key(key) {
            return;
        }
        let seq = self.next;
        self.next += 1;
        self.index.insert(key.to_string(), seq);
        self.order.insert(seq, key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(seq) = self.index.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Keys ==
    /// Returns tracked keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.order.values().cloned().collect()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Contains ==
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }
}
