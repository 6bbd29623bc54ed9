//! Rate Limit Options Module
//!
//! Per-call options, instance defaults, the stored window record and the
//! result returned to callers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{ExternalStore, StorageKind};
use crate::time::TimeSpec;

/// Key used when neither the call nor the defaults name one.
pub const DEFAULT_KEY: &str = "default";

// == Rate Limit Options ==
/// Options for one `check` call.
#[derive(Clone)]
pub struct RateLimitOptions {
    /// Requests allowed per window
    pub limit: u64,
    /// Window length
    pub interval: TimeSpec,
    /// Cooldown applied when the window fills; defaults to `interval`
    pub block_duration: Option<TimeSpec>,
    pub storage: Option<StorageKind>,
    pub key: Option<String>,
    /// Warn when a key is blocked
    pub logs: Option<bool>,
    /// Client used by the external backend
    pub external: Option<Arc<dyn ExternalStore>>,
}

impl RateLimitOptions {
    pub fn new(limit: u64, interval: impl Into<TimeSpec>) -> Self {
        Self {
            limit,
            interval: interval.into(),
            block_duration: None,
            storage: None,
            key: None,
            logs: None,
            external: None,
        }
    }

    pub fn block_duration(mut self, duration: impl Into<TimeSpec>) -> Self {
        self.block_duration = Some(duration.into());
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn logs(mut self, logs: bool) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn external(mut self, store: Arc<dyn ExternalStore>) -> Self {
        self.external = Some(store);
        self
    }
}

impl fmt::Debug for RateLimitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitOptions")
            .field("limit", &self.limit)
            .field("interval", &self.interval)
            .field("block_duration", &self.block_duration)
            .field("storage", &self.storage)
            .field("key", &self.key)
            .field("logs", &self.logs)
            .field("external", &self.external.is_some())
            .finish()
    }
}

// == Rate Limit Defaults ==
/// Instance-level defaults; any field set on a call overrides these.
#[derive(Clone, Default)]
pub struct RateLimitDefaults {
    pub block_duration: Option<TimeSpec>,
    pub storage: Option<StorageKind>,
    pub key: Option<String>,
    pub logs: Option<bool>,
    pub external: Option<Arc<dyn ExternalStore>>,
}

impl RateLimitDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_duration(mut self, duration: impl Into<TimeSpec>) -> Self {
        self.block_duration = Some(duration.into());
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn logs(mut self, logs: bool) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn external(mut self, store: Arc<dyn ExternalStore>) -> Self {
        self.external = Some(store);
        self
    }

    // == Merge ==
    /// Fills the unset fields of `call` from these defaults.
    pub fn merge(&self, call: RateLimitOptions) -> RateLimitOptions {
        RateLimitOptions {
            limit: call.limit,
            interval: call.interval,
            block_duration: call.block_duration.or_else(|| self.block_duration.clone()),
            storage: call.storage.or(self.storage),
            key: call.key.or_else(|| self.key.clone()),
            logs: call.logs.or(self.logs),
            external: call.external.or_else(|| self.external.clone()),
        }
    }
}

impl fmt::Debug for RateLimitDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitDefaults")
            .field("block_duration", &self.block_duration)
            .field("storage", &self.storage)
            .field("key", &self.key)
            .field("logs", &self.logs)
            .field("external", &self.external.is_some())
            .finish()
    }
}

// == Rate Limit Record ==
/// Counter state for one key's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Requests counted in the current window
    pub count: u64,
    /// When the window or block ends (Unix milliseconds)
    pub reset_at: i64,
}

impl RateLimitRecord {
    /// An empty window ending `interval_ms` after `now`.
    pub fn fresh(now: i64, interval_ms: i64) -> Self {
        Self {
            count: 0,
            reset_at: now.saturating_add(interval_ms),
        }
    }

    /// True once `now` is strictly past the reset time.
    pub fn is_stale_at(&self, now: i64) -> bool {
        now > self.reset_at
    }

    // == Consume ==
    /// Counts one request.
    ///
    /// Returns false and leaves the record untouched when the window is
    /// already full. The request that fills the window moves `reset_at` to
    /// `now + block_ms`.
    pub fn consume(&mut self, limit: u64, block_ms: i64, now: i64) -> bool {
        if self.count >= limit {
            return false;
        }
        self.count += 1;
        if self.count >= limit {
            self.reset_at = now.saturating_add(block_ms);
        }
        true
    }
}

// == Rate Limit Result ==
/// Outcome of one `check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
    pub success: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix milliseconds when the caller may try again
    pub reset: i64,
}

impl RateLimitResult {
    pub fn allowed(limit: u64, record: &RateLimitRecord) -> Self {
        Self {
            success: true,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset: record.reset_at,
        }
    }

    pub fn blocked(limit: u64, record: &RateLimitRecord) -> Self {
        Self {
            success: false,
            limit,
            remaining: 0,
            reset: record.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_counts_until_full() {
        let mut record = RateLimitRecord::fresh(1_000, 500);
        assert_eq!(record.reset_at, 1_500);

        assert!(record.consume(2, 10_000, 1_100));
        assert_eq!(record.count, 1);
        assert_eq!(record.reset_at, 1_500);

        assert!(record.consume(2, 10_000, 1_200));
        assert_eq!(record.count, 2);
        assert_eq!(record.reset_at, 11_200);

        assert!(!record.consume(2, 10_000, 1_300));
        assert_eq!(record, RateLimitRecord { count: 2, reset_at: 11_200 });
    }

    #[test]
    fn test_staleness_is_strict() {
        let record = RateLimitRecord::fresh(0, 100);
        assert!(!record.is_stale_at(100));
        assert!(record.is_stale_at(101));
    }

    #[test]
    fn test_record_wire_format() {
        let record = RateLimitRecord { count: 3, reset_at: 42 };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"count":3,"resetAt":42}"#
        );
    }

    #[test]
    fn test_defaults_merge_call_wins() {
        let defaults = RateLimitDefaults::new()
            .storage(StorageKind::SessionStorage)
            .key("fallback")
            .block_duration("1min");
        let call = RateLimitOptions::new(5, "10s").key("user:1");

        let merged = defaults.merge(call);
        assert_eq!(merged.limit, 5);
        assert_eq!(merged.key.as_deref(), Some("user:1"));
        assert_eq!(merged.storage, Some(StorageKind::SessionStorage));
        assert_eq!(merged.block_duration, Some(TimeSpec::from("1min")));
        assert_eq!(merged.logs, None);
    }

    #[test]
    fn test_result_constructors() {
        let record = RateLimitRecord { count: 3, reset_at: 99 };
        assert_eq!(
            RateLimitResult::allowed(5, &record),
            RateLimitResult { success: true, limit: 5, remaining: 2, reset: 99 }
        );
        assert_eq!(
            RateLimitResult::blocked(5, &record),
            RateLimitResult { success: false, limit: 5, remaining: 0, reset: 99 }
        );
    }
}
