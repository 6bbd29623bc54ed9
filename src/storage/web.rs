//! Web Storage Module
//!
//! Adapter over a browser-style `Storage` area (local or session storage).
//! Records are serialized to JSON text under a namespaced key.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::{StorageAdapter, StorageKind};

// == Web Storage Area ==
/// The subset of the browser `Storage` API the adapters rely on.
pub trait WebStorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
    /// All keys currently in the area, including foreign ones.
    fn keys(&self) -> Vec<String>;
    fn clear(&self);
}

// == In-Memory Web Storage ==
/// Process-local stand-in for a browser storage area.
#[derive(Debug, Default)]
pub struct InMemoryWebStorage {
    items: Mutex<Vec<(String, String)>>,
}

impl InMemoryWebStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl WebStorageArea for InMemoryWebStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.lock();
        match items.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => items.push((key.to_string(), value.to_string())),
        }
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().retain(|(k, _)| k != key);
    }

    fn keys(&self) -> Vec<String> {
        self.items.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    fn clear(&self) {
        self.items.lock().clear();
    }
}

// == Web Storage Adapter ==
/// Namespaced JSON adapter over a [`WebStorageArea`].
///
/// Without an area (no client document) every operation is a no-op.
pub struct WebStorageAdapter<T> {
    kind: StorageKind,
    area: Option<Arc<dyn WebStorageArea>>,
    prefix: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> WebStorageAdapter<T> {
    pub fn new(
        kind: StorageKind,
        area: Option<Arc<dyn WebStorageArea>>,
        prefix: &'static str,
    ) -> Self {
        Self {
            kind,
            area,
            prefix,
            _record: PhantomData,
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<T: Serialize + DeserializeOwned> StorageAdapter<T> for WebStorageAdapter<T> {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.area.is_some()
    }

    fn read(&self, key: &str) -> Option<T> {
        let area = self.area.as_ref()?;
        let raw = area.get_item(&self.namespaced(key))?;
        serde_json::from_str(&raw).ok()
    }

    fn write(&mut self, key: &str, value: &T, _ttl_hint_ms: Option<i64>) {
        let Some(area) = self.area.as_ref() else {
            return;
        };
        match serde_json::to_string(value) {
            Ok(raw) => area.set_item(&self.namespaced(key), &raw),
            Err(err) => warn!("Failed to serialize record for {}: {}", key, err),
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(area) = self.area.as_ref() {
            area.remove_item(&self.namespaced(key));
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(area) = self.area.as_ref() else {
            return Vec::new();
        };
        area.keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix).map(str::to_string))
            .collect()
    }

    /// Removes only namespaced keys; foreign data in the area is left alone.
    fn clear(&mut self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }
}
