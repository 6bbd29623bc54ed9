//! Cache Entry Module
//!
//! Defines individual cache entries with TTL and use-count limits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::current_timestamp_ms;

// == Cache Entry ==
/// A stored value plus the metadata needed to decide its expiry.
///
/// Serialized flat as `{value, createdAt, uses, ttl, maxUses}` for text backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Number of successful reads so far
    pub uses: u64,
    /// Lifetime in milliseconds, None = no time expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    /// Read budget, None = unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a fresh entry stamped with the current time and zero uses.
    pub fn new(value: Value, ttl: Option<i64>, max_uses: Option<u64>) -> Self {
        Self {
            value,
            created_at: current_timestamp_ms(),
            uses: 0,
            ttl,
            max_uses,
        }
    }

    // == Is Expired ==
    /// True once strictly more than `ttl` milliseconds have passed since creation.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_sub(self.created_at) > ttl,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Is Exhausted ==
    /// True once the read budget has been spent.
    pub fn is_exhausted(&self) -> bool {
        match self.max_uses {
            Some(max) => self.uses >= max,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds at `now`, or None without a TTL.
    pub fn ttl_remaining_ms(&self, now: i64) -> Option<i64> {
        self.ttl
            .map(|ttl| self.created_at.saturating_add(ttl).saturating_sub(now).max(0))
    }
}
