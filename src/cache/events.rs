//! Cache Events Module
//!
//! Synchronous publish/subscribe for cache lifecycle events.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Result, ToolkitError};
use crate::storage::StorageKind;

// == Event Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEventKind {
    Set,
    Get,
    Expire,
    Delete,
    Clear,
}

// == Cache Event ==
/// Payload delivered to listeners. `key` is None only for `Clear`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEvent {
    pub kind: CacheEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub storage: StorageKind,
}

impl CacheEvent {
    pub fn keyed(kind: CacheEventKind, key: &str, storage: StorageKind) -> Self {
        Self {
            kind,
            key: Some(key.to_string()),
            storage,
        }
    }

    pub fn clear(storage: StorageKind) -> Self {
        Self {
            kind: CacheEventKind::Clear,
            key: None,
            storage,
        }
    }
}

/// A subscriber; returning an error aborts delivery to later listeners.
pub type CacheListener = Box<dyn Fn(&CacheEvent) -> anyhow::Result<()> + Send + Sync>;

// == Event Bus ==
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<CacheEventKind, Vec<CacheListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: CacheEventKind, listener: F)
    where
        F: Fn(&CacheEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners
            .entry(kind)
            .or_default()
            .push(Box::new(listener));
    }

    /// Calls listeners for the event's kind in registration order.
    pub fn emit(&self, event: &CacheEvent) -> Result<()> {
        if let Some(listeners) = self.listeners.get(&event.kind) {
            for listener in listeners {
                listener(event).map_err(ToolkitError::Listener)?;
            }
        }
        Ok(())
    }
}
