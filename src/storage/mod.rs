//! Storage Module
//!
//! Uniform read/write/remove/enumerate/clear contract over interchangeable
//! backends: an in-process map, browser-style local/session storage, cookies,
//! and an external key-value service.

mod cookie;
mod external;
mod memory;
mod order;
mod web;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ToolkitError;

pub use cookie::{CookieAdapter, CookieDocument, CookieJar};
pub use external::{ExternalStore, MemoryExternalStore, RedisStore};
pub use memory::MemoryStore;
pub use order::KeyOrder;
pub use web::{InMemoryWebStorage, WebStorageAdapter, WebStorageArea};

// == Storage Kind ==
/// The closed set of backends an engine can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKind {
    #[default]
    Memory,
    LocalStorage,
    SessionStorage,
    Cookies,
    #[serde(rename = "redis", alias = "external")]
    External,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::LocalStorage => "localStorage",
            StorageKind::SessionStorage => "sessionStorage",
            StorageKind::Cookies => "cookies",
            StorageKind::External => "redis",
        }
    }

    /// True for backends that need a client document.
    pub fn is_client_only(&self) -> bool {
        matches!(
            self,
            StorageKind::LocalStorage | StorageKind::SessionStorage | StorageKind::Cookies
        )
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "localstorage" | "local" => Ok(StorageKind::LocalStorage),
            "sessionstorage" | "session" => Ok(StorageKind::SessionStorage),
            "cookies" | "cookie" => Ok(StorageKind::Cookies),
            "redis" | "external" => Ok(StorageKind::External),
            other => Err(ToolkitError::InvalidRequest(format!(
                "unknown storage kind: {}",
                other
            ))),
        }
    }
}

// == Storage Adapter ==
/// Capability contract every backend satisfies.
///
/// Reads never fail: missing or malformed data reads as `None`.
pub trait StorageAdapter<T> {
    fn kind(&self) -> StorageKind;
    /// False when the backend has no context to operate on.
    fn is_available(&self) -> bool;
    fn read(&self, key: &str) -> Option<T>;
    fn write(&mut self, key: &str, value: &T, ttl_hint_ms: Option<i64>);
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
    fn clear(&mut self);
}

// == Client Context ==
/// Handles to the client document's storage areas.
///
/// Engines built without one behave as if running outside a browser.
#[derive(Clone)]
pub struct ClientContext {
    pub local: Arc<dyn WebStorageArea>,
    pub session: Arc<dyn WebStorageArea>,
    pub cookies: Arc<dyn CookieDocument>,
}

impl ClientContext {
    pub fn new(
        local: Arc<dyn WebStorageArea>,
        session: Arc<dyn WebStorageArea>,
        cookies: Arc<dyn CookieDocument>,
    ) -> Self {
        Self {
            local,
            session,
            cookies,
        }
    }

    /// A context backed entirely by in-process fakes.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryWebStorage::new()),
            Arc::new(InMemoryWebStorage::new()),
            Arc::new(CookieJar::new()),
        )
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext").finish_non_exhaustive()
    }
}

// == Backends ==
/// One adapter per local backend kind, resolved by [`StorageKind`].
pub struct Backends<T> {
    memory: MemoryStore<T>,
    local: WebStorageAdapter<T>,
    session: WebStorageAdapter<T>,
    cookies: CookieAdapter<T>,
    has_client: bool,
}

impl<T> Backends<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Builds the adapter set, namespacing client keys with `prefix`.
    pub fn new(client: Option<&ClientContext>, prefix: &'static str) -> Self {
        Self {
            memory: MemoryStore::new(),
            local: WebStorageAdapter::new(
                StorageKind::LocalStorage,
                client.map(|c| c.local.clone()),
                prefix,
            ),
            session: WebStorageAdapter::new(
                StorageKind::SessionStorage,
                client.map(|c| c.session.clone()),
                prefix,
            ),
            cookies: CookieAdapter::new(client.map(|c| c.cookies.clone()), prefix),
            has_client: client.is_some(),
        }
    }

    pub fn has_client(&self) -> bool {
        self.has_client
    }

    /// Direct access to the in-process store.
    pub fn memory(&self) -> &MemoryStore<T> {
        &self.memory
    }

    /// Resolves a kind to its adapter; `External` has no local adapter.
    pub fn select(&mut self, kind: StorageKind) -> Option<&mut dyn StorageAdapter<T>> {
        match kind {
            StorageKind::Memory => Some(&mut self.memory),
            StorageKind::LocalStorage => Some(&mut self.local),
            StorageKind::SessionStorage => Some(&mut self.session),
            StorageKind::Cookies => Some(&mut self.cookies),
            StorageKind::External => None,
        }
    }

    /// Read-only variant of [`Backends::select`].
    pub fn select_ref(&self, kind: StorageKind) -> Option<&dyn StorageAdapter<T>> {
        match kind {
            StorageKind::Memory => Some(&self.memory),
            StorageKind::LocalStorage => Some(&self.local),
            StorageKind::SessionStorage => Some(&self.session),
            StorageKind::Cookies => Some(&self.cookies),
            StorageKind::External => None,
        }
    }
}
