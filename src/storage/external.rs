//! External Store Module
//!
//! Network-backed text store used by the rate limiter. Every write carries an
//! explicit expiry so stale counters clean themselves up without a read.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use crate::error::Result;
use crate::time::current_timestamp_ms;

// == External Store ==
/// Minimal client contract for an external key-value service.
#[async_trait]
pub trait ExternalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, expiry_ms: u64) -> Result<()>;
}

// == Redis Store ==
/// [`ExternalStore`] backed by Redis (`GET` / `SET .. PX`).
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connects to the Redis instance at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Redis store connected to {}", url);
        Ok(Self { connection })
    }
}

#[async_trait]
impl ExternalStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, expiry_ms: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(expiry_ms)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!("SET {} PX {}", key, expiry_ms);
        Ok(())
    }
}

// == Memory External Store ==
/// In-process [`ExternalStore`] with lazy expiry, for tests and single-node use.
#[derive(Debug, Default)]
pub struct MemoryExternalStore {
    entries: Mutex<HashMap<String, (String, i64)>>,
}

impl MemoryExternalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the absolute expiry (Unix ms) recorded for a key.
    pub fn expires_at(&self, key: &str) -> Option<i64> {
        self.entries.lock().get(key).map(|(_, at)| *at)
    }
}

#[async_trait]
impl ExternalStore for MemoryExternalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, expiry_ms: u64) -> Result<()> {
        let expiry_ms = i64::try_from(expiry_ms).unwrap_or(i64::MAX);
        let expires_at = current_timestamp_ms().saturating_add(expiry_ms);
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}
