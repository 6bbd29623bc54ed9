//! Cache Store Module
//!
//! Main cache engine: TTL and use-count expiry over pluggable storage
//! backends, with lifecycle events. Expiry is detected lazily on read.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::cache::{
    CacheEntry, CacheEvent, CacheEventKind, CacheOptions, EventBus, LogMode, CACHE_KEY_PREFIX,
};
use crate::error::{Result, ToolkitError};
use crate::storage::{Backends, ClientContext, StorageKind};
use crate::time::{current_timestamp_ms, parse_time};

// == Cache ==
/// Key/value cache with per-entry TTL and read budget.
///
/// Not internally synchronized; wrap in a lock to share across tasks.
pub struct Cache {
    /// Instance defaults merged under every call
    defaults: CacheOptions,
    /// One adapter per storage kind
    backends: Backends<CacheEntry>,
    /// Lifecycle subscribers
    events: EventBus,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache with no client document; client backends are no-ops.
    pub fn new(defaults: CacheOptions) -> Self {
        Self::build(defaults, None)
    }

    /// Creates a cache whose client backends use the given context.
    pub fn with_client(defaults: CacheOptions, client: ClientContext) -> Self {
        Self::build(defaults, Some(client))
    }

    fn build(defaults: CacheOptions, client: Option<ClientContext>) -> Self {
        Self {
            defaults: CacheOptions::instance_defaults().merge(&defaults),
            backends: Backends::new(client.as_ref(), CACHE_KEY_PREFIX),
            events: EventBus::new(),
        }
    }

    pub fn defaults(&self) -> &CacheOptions {
        &self.defaults
    }

    fn resolve(&self, options: Option<CacheOptions>) -> CacheOptions {
        match options {
            Some(call) => self.defaults.merge(&call),
            None => self.defaults.clone(),
        }
    }

    fn storage_kind(&self, storage: Option<StorageKind>) -> StorageKind {
        storage.or(self.defaults.storage).unwrap_or_default()
    }

    // == Add Event Listener ==
    /// Registers a listener; listeners for one kind run in registration order.
    pub fn add_event_listener<F>(&mut self, kind: CacheEventKind, listener: F)
    where
        F: Fn(&CacheEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe(kind, listener);
    }

    // == Set ==
    /// Stores a value, replacing any existing entry and resetting its use count.
    ///
    /// # Errors
    /// `InvalidFormat` for a bad TTL string, `Listener` if a `set` listener fails.
    pub fn set<V: Serialize>(
        &mut self,
        key: &str,
        value: V,
        options: Option<CacheOptions>,
    ) -> Result<()> {
        let config = self.resolve(options);
        let ttl = match &config.ttl {
            Some(spec) => Some(parse_time(spec)?).filter(|ms| *ms != 0),
            None => None,
        };
        let max_uses = config.max_uses.and_then(|m| m.limit());
        let entry = CacheEntry::new(serde_json::to_value(value)?, ttl, max_uses);
        let kind = self.storage_kind(config.storage);

        let adapter = self.backends.select(kind).ok_or_else(|| unsupported(kind))?;
        if !adapter.is_available() {
            return Ok(());
        }
        adapter.write(key, &entry, entry.ttl);
        debug!("Cache set {} in {} (ttl={:?}, max_uses={:?})", key, kind, ttl, max_uses);

        self.events
            .emit(&CacheEvent::keyed(CacheEventKind::Set, key, kind))
    }

    // == Get ==
    /// Reads a value, consuming one use.
    ///
    /// Time-expired entries are removed and reported via `expire`. The read
    /// that spends the last use still returns the value, then removes the
    /// entry and emits `delete` followed by `get`.
    ///
    /// A value that does not deserialize into `V` fails with `Serialization`
    /// and leaves the entry untouched.
    pub fn get<V: DeserializeOwned>(
        &mut self,
        key: &str,
        options: Option<CacheOptions>,
    ) -> Result<Option<V>> {
        let config = self.resolve(options);
        let kind = self.storage_kind(config.storage);
        let adapter = self.backends.select(kind).ok_or_else(|| unsupported(kind))?;

        let Some(mut entry) = adapter.read(key) else {
            return Ok(None);
        };

        let now = current_timestamp_ms();
        if entry.is_expired_at(now) {
            adapter.remove(key);
            debug!("Cache entry {} expired in {}", key, kind);
            self.events
                .emit(&CacheEvent::keyed(CacheEventKind::Expire, key, kind))?;
            return Ok(None);
        }

        let value: V = serde_json::from_value(entry.value.clone())?;

        entry.uses += 1;
        if entry.is_exhausted() {
            adapter.remove(key);
            debug!("Cache entry {} spent its {} uses", key, entry.uses);
            self.events
                .emit(&CacheEvent::keyed(CacheEventKind::Delete, key, kind))?;
        } else {
            adapter.write(key, &entry, entry.ttl_remaining_ms(now));
        }

        if config.logs == Some(LogMode::Usage) {
            info!(key = %key, uses = entry.uses, storage = %kind, "Cache usage");
        }

        self.events
            .emit(&CacheEvent::keyed(CacheEventKind::Get, key, kind))?;

        Ok(Some(value))
    }

    // == Reset ==
    /// Removes one key and emits `delete`.
    pub fn reset(&mut self, key: &str, storage: Option<StorageKind>) -> Result<()> {
        let kind = self.storage_kind(storage);
        let adapter = self.backends.select(kind).ok_or_else(|| unsupported(kind))?;
        if !adapter.is_available() {
            return Ok(());
        }
        adapter.remove(key);
        self.events
            .emit(&CacheEvent::keyed(CacheEventKind::Delete, key, kind))
    }

    // == Clear All ==
    /// Removes every entry in one backend: a `delete` per key, then `clear`.
    pub fn clear_all(&mut self, storage: Option<StorageKind>) -> Result<()> {
        let kind = self.storage_kind(storage);
        let adapter = self.backends.select(kind).ok_or_else(|| unsupported(kind))?;
        if !adapter.is_available() {
            return Ok(());
        }

        let keys = adapter.keys();
        let count = keys.len();
        for key in keys {
            adapter.remove(&key);
            self.events
                .emit(&CacheEvent::keyed(CacheEventKind::Delete, &key, kind))?;
        }
        adapter.clear();
        debug!("Cache cleared {} entries from {}", count, kind);

        self.events.emit(&CacheEvent::clear(kind))
    }

    // == Get All ==
    /// Snapshot of a backend's entries; does not consume uses or emit events.
    pub fn get_all(&self, storage: Option<StorageKind>) -> HashMap<String, CacheEntry> {
        let kind = self.storage_kind(storage);
        let Some(adapter) = self.backends.select_ref(kind) else {
            return HashMap::new();
        };
        adapter
            .keys()
            .into_iter()
            .filter_map(|key| adapter.read(&key).map(|entry| (key, entry)))
            .collect()
    }

    /// Number of entries held by the in-process backend.
    pub fn len(&self) -> usize {
        self.backends.memory().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.memory().is_empty()
    }
}

fn unsupported(kind: StorageKind) -> ToolkitError {
    ToolkitError::InvalidRequest(format!("cache does not support {} storage", kind))
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(CacheOptions::instance_defaults())
    }
}
