//! Rate Limiter Engine
//!
//! Fixed-window counters per key with a block-duration override once a
//! window fills. Windows expire lazily on the next check.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, ToolkitError};
use crate::rate_limit::{
    RateLimitDefaults, RateLimitOptions, RateLimitRecord, RateLimitResult, DEFAULT_KEY,
    EXTERNAL_KEY_PREFIX, RATE_LIMIT_KEY_PREFIX,
};
use crate::storage::{Backends, ClientContext, ExternalStore, StorageKind};
use crate::time::{current_timestamp_ms, parse_time};

/// Fully resolved settings for one check.
struct Resolved {
    limit: u64,
    interval_ms: i64,
    block_ms: i64,
    key: String,
    storage: StorageKind,
    logs: bool,
    external: Option<Arc<dyn ExternalStore>>,
}

// == Rate Limiter ==
/// Fixed-window rate limiter over the memory, browser and external backends.
///
/// Local backends need `&mut self`, so concurrent checks on them must be
/// serialized by the caller. External checks only need `&self`.
pub struct RateLimiter {
    defaults: RateLimitDefaults,
    backends: Backends<RateLimitRecord>,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a limiter with no client document.
    pub fn new(defaults: RateLimitDefaults) -> Self {
        Self {
            defaults,
            backends: Backends::new(None, RATE_LIMIT_KEY_PREFIX),
        }
    }

    /// Creates a limiter whose browser backends use the given context.
    pub fn with_client(defaults: RateLimitDefaults, client: ClientContext) -> Self {
        Self {
            defaults,
            backends: Backends::new(Some(&client), RATE_LIMIT_KEY_PREFIX),
        }
    }

    pub fn defaults(&self) -> &RateLimitDefaults {
        &self.defaults
    }

    fn resolve(&self, options: RateLimitOptions) -> Result<Resolved> {
        let config = self.defaults.merge(options);
        if config.limit == 0 {
            return Err(ToolkitError::InvalidRequest(
                "rate limit must be a positive integer".to_string(),
            ));
        }

        let interval_ms = parse_time(&config.interval)?;
        let block_ms = match &config.block_duration {
            Some(spec) => Some(parse_time(spec)?).filter(|ms| *ms != 0),
            None => None,
        }
        .unwrap_or(interval_ms);

        Ok(Resolved {
            limit: config.limit,
            interval_ms,
            block_ms,
            key: config.key.unwrap_or_else(|| DEFAULT_KEY.to_string()),
            storage: config.storage.unwrap_or_default(),
            logs: config.logs.unwrap_or(false),
            external: config.external,
        })
    }

    /// True when `options` resolve to the external backend.
    pub fn uses_external(&self, options: &RateLimitOptions) -> bool {
        options.storage.or(self.defaults.storage) == Some(StorageKind::External)
    }

    // == Check ==
    /// Counts one request against `options.key` and reports whether it is allowed.
    ///
    /// A rejected check never touches the stored record, so the reported
    /// `reset` stays fixed until the block elapses.
    ///
    /// # Errors
    /// - `InvalidFormat` for a bad interval or block duration
    /// - `EnvironmentMismatch` for browser storage without a client context
    /// - `MissingDependency` for external storage without a client
    /// - `Backend` if the external round trip fails
    pub async fn check(&mut self, options: RateLimitOptions) -> Result<RateLimitResult> {
        let config = self.resolve(options)?;

        let result = match config.storage {
            StorageKind::External => check_remote(&config).await?,
            _ => self.check_local(&config)?,
        };

        report(&config, &result);
        Ok(result)
    }

    /// Checks against the external store only.
    ///
    /// Needs no exclusive access, so callers can hold a shared lock across
    /// the network round trip.
    ///
    /// # Errors
    /// `InvalidRequest` if `options` resolve to any other backend, otherwise
    /// the same as [`RateLimiter::check`].
    pub async fn check_external(&self, options: RateLimitOptions) -> Result<RateLimitResult> {
        let config = self.resolve(options)?;
        if config.storage != StorageKind::External {
            return Err(ToolkitError::InvalidRequest(format!(
                "{} storage needs exclusive access to the limiter",
                config.storage
            )));
        }

        let result = check_remote(&config).await?;
        report(&config, &result);
        Ok(result)
    }

    fn check_local(&mut self, config: &Resolved) -> Result<RateLimitResult> {
        let kind = config.storage;
        if kind == StorageKind::Cookies {
            return Err(ToolkitError::InvalidRequest(
                "rate limiter does not support cookie storage".to_string(),
            ));
        }

        if kind.is_client_only() && !self.backends.has_client() {
            return Err(ToolkitError::EnvironmentMismatch(format!(
                "{} rate limiting needs a client context",
                kind
            )));
        }

        let adapter = self.backends.select(kind).ok_or_else(|| {
            ToolkitError::InvalidRequest(format!("rate limiter does not support {} storage", kind))
        })?;

        let now = current_timestamp_ms();
        let mut record = match adapter.read(&config.key) {
            Some(record) if !record.is_stale_at(now) => record,
            _ => {
                let fresh = RateLimitRecord::fresh(now, config.interval_ms);
                adapter.write(&config.key, &fresh, Some(config.interval_ms));
                debug!("Rate limit window opened for {} in {}", config.key, kind);
                fresh
            }
        };

        if !record.consume(config.limit, config.block_ms, now) {
            return Ok(RateLimitResult::blocked(config.limit, &record));
        }
        adapter.write(&config.key, &record, Some(record.reset_at - now));

        Ok(RateLimitResult::allowed(config.limit, &record))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitDefaults::default())
    }
}

fn report(config: &Resolved, result: &RateLimitResult) {
    if !result.success && config.logs {
        warn!(
            key = %config.key,
            storage = %config.storage,
            reset = result.reset,
            "Rate limit exceeded"
        );
    }
}

// == External Backend ==
async fn check_remote(config: &Resolved) -> Result<RateLimitResult> {
    let store = config.external.as_ref().ok_or_else(|| {
        ToolkitError::MissingDependency("no external store configured for rate limiting".to_string())
    })?;
    let key = format!("{}{}", EXTERNAL_KEY_PREFIX, config.key);

    let now = current_timestamp_ms();
    let stored = store
        .get(&key)
        .await?
        .and_then(|raw| serde_json::from_str::<RateLimitRecord>(&raw).ok())
        .filter(|record| !record.is_stale_at(now));

    let mut record = match stored {
        Some(record) => record,
        None => {
            let fresh = RateLimitRecord::fresh(now, config.interval_ms);
            store
                .set(&key, &serde_json::to_string(&fresh)?, expiry(config.interval_ms))
                .await?;
            fresh
        }
    };

    let now = current_timestamp_ms();
    if !record.consume(config.limit, config.block_ms, now) {
        return Ok(RateLimitResult::blocked(config.limit, &record));
    }
    store
        .set(&key, &serde_json::to_string(&record)?, expiry(record.reset_at - now))
        .await?;

    Ok(RateLimitResult::allowed(config.limit, &record))
}

/// External expiries must be positive.
fn expiry(ms: i64) -> u64 {
    ms.max(1) as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::storage::{MemoryExternalStore, WebStorageArea};

    fn options(limit: u64, interval: &str) -> RateLimitOptions {
        RateLimitOptions::new(limit, interval).key("test")
    }

    #[tokio::test]
    async fn test_counts_down_then_blocks() {
        let mut limiter = RateLimiter::default();
        let opts = options(5, "1min");

        for expected in (0..5).rev() {
            let result = limiter.check(opts.clone()).await.unwrap();
            assert!(result.success);
            assert_eq!(result.limit, 5);
            assert_eq!(result.remaining, expected);
        }

        let now = current_timestamp_ms();
        let blocked = limiter.check(opts).await.unwrap();
        assert!(!blocked.success);
        assert_eq!(blocked.remaining, 0);
        assert!(blocked.reset > now + 50_000 && blocked.reset <= now + 60_000);
    }

    #[tokio::test]
    async fn test_block_is_sticky() {
        let mut limiter = RateLimiter::default();
        let opts = options(2, "1min");

        limiter.check(opts.clone()).await.unwrap();
        let filling = limiter.check(opts.clone()).await.unwrap();

        let first = limiter.check(opts.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = limiter.check(opts).await.unwrap();

        assert!(!first.success && !second.success);
        assert_eq!(first.reset, filling.reset);
        assert_eq!(second.reset, first.reset);
    }

    #[tokio::test]
    async fn test_window_resets_after_interval() {
        let mut limiter = RateLimiter::default();
        let opts = options(1, "100ms");

        assert!(limiter.check(opts.clone()).await.unwrap().success);
        assert!(!limiter.check(opts.clone()).await.unwrap().success);

        tokio::time::sleep(Duration::from_millis(120)).await;

        let result = limiter.check(opts).await.unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, 0);
    }

    #[tokio::test]
    async fn test_block_duration_overrides_interval() {
        let mut limiter = RateLimiter::default();
        let opts = options(5, "10s").block_duration("1min");

        let now = current_timestamp_ms();
        for _ in 0..4 {
            let result = limiter.check(opts.clone()).await.unwrap();
            assert!(result.reset <= now + 10_000 + 50);
        }

        let filling = limiter.check(opts.clone()).await.unwrap();
        assert!(filling.success);
        assert_eq!(filling.remaining, 0);
        assert!(filling.reset >= now + 60_000);

        let blocked = limiter.check(opts).await.unwrap();
        assert!(!blocked.success);
        assert_eq!(blocked.reset, filling.reset);
    }

    #[tokio::test]
    async fn test_block_defaults_to_interval() {
        let mut limiter = RateLimiter::default();
        let now = current_timestamp_ms();

        let result = limiter.check(options(1, "2s")).await.unwrap();
        assert!(result.reset >= now + 2_000 && result.reset <= now + 2_050);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let mut limiter = RateLimiter::default();

        assert!(limiter.check(RateLimitOptions::new(1, 1_000).key("a")).await.unwrap().success);
        assert!(!limiter.check(RateLimitOptions::new(1, 1_000).key("a")).await.unwrap().success);
        assert!(limiter.check(RateLimitOptions::new(1, 1_000).key("b")).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_default_key() {
        let mut limiter = RateLimiter::default();

        limiter.check(RateLimitOptions::new(1, 1_000)).await.unwrap();
        let keyed = limiter
            .check(RateLimitOptions::new(1, 1_000).key(DEFAULT_KEY))
            .await
            .unwrap();
        assert!(!keyed.success);
    }

    #[tokio::test]
    async fn test_defaults_apply() {
        let client = ClientContext::in_memory();
        let mut limiter = RateLimiter::with_client(
            RateLimitDefaults::new().storage(StorageKind::LocalStorage).key("shared"),
            client.clone(),
        );

        limiter.check(RateLimitOptions::new(3, "1min")).await.unwrap();

        let raw = client.local.get_item("mtk.ratelimit.shared").unwrap();
        let record: RateLimitRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_invalid_interval() {
        let mut limiter = RateLimiter::default();
        let err = limiter.check(options(1, "soon")).await.unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let mut limiter = RateLimiter::default();
        let err = limiter.check(options(0, "1s")).await.unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_browser_storage_without_client() {
        let mut limiter = RateLimiter::default();

        for kind in [StorageKind::LocalStorage, StorageKind::SessionStorage] {
            let err = limiter
                .check(options(1, "1s").storage(kind))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolkitError::EnvironmentMismatch(_)));
        }
    }

    #[tokio::test]
    async fn test_cookie_storage_rejected() {
        let mut limiter = RateLimiter::with_client(RateLimitDefaults::new(), ClientContext::in_memory());
        let err = limiter
            .check(options(1, "1s").storage(StorageKind::Cookies))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_session_storage_persists_window() {
        let client = ClientContext::in_memory();
        let mut limiter = RateLimiter::with_client(RateLimitDefaults::new(), client.clone());
        let opts = options(2, "1min").storage(StorageKind::SessionStorage);

        limiter.check(opts.clone()).await.unwrap();
        limiter.check(opts.clone()).await.unwrap();
        assert!(!limiter.check(opts.clone()).await.unwrap().success);

        // A second limiter over the same area sees the same window.
        let mut other = RateLimiter::with_client(RateLimitDefaults::new(), client.clone());
        assert!(!other.check(opts).await.unwrap().success);
        assert!(client.local.get_item("mtk.ratelimit.test").is_none());
    }

    #[tokio::test]
    async fn test_malformed_record_starts_fresh_window() {
        let client = ClientContext::in_memory();
        client.local.set_item("mtk.ratelimit.test", "{not json");
        let mut limiter = RateLimiter::with_client(RateLimitDefaults::new(), client.clone());

        let result = limiter
            .check(options(3, "1min").storage(StorageKind::LocalStorage))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, 2);
    }

    #[tokio::test]
    async fn test_external_without_client() {
        let mut limiter = RateLimiter::default();
        let err = limiter
            .check(options(1, "1s").storage(StorageKind::External))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolkitError::MissingDependency(_)));
    }

    #[tokio::test]
    async fn test_external_store_path() {
        let store = Arc::new(MemoryExternalStore::new());
        let mut limiter = RateLimiter::new(
            RateLimitDefaults::new()
                .storage(StorageKind::External)
                .external(store.clone()),
        );
        let opts = options(2, "1min").block_duration("5min");

        let now = current_timestamp_ms();
        let first = limiter.check(opts.clone()).await.unwrap();
        assert_eq!(first.remaining, 1);

        let key = "mtk:ratelimit:test";
        let raw = store.get(key).await.unwrap().unwrap();
        let record: RateLimitRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.count, 1);
        let expires_at = store.expires_at(key).unwrap();
        assert!(expires_at >= first.reset - 50 && expires_at <= first.reset + 50);

        let filling = limiter.check(opts.clone()).await.unwrap();
        assert!(filling.success);
        assert!(filling.reset >= now + 300_000);

        let blocked = limiter.check(opts).await.unwrap();
        assert!(!blocked.success);
        assert_eq!(blocked.reset, filling.reset);
    }

    #[tokio::test]
    async fn test_external_malformed_record() {
        let store = Arc::new(MemoryExternalStore::new());
        store.set("mtk:ratelimit:test", "garbage", 60_000).await.unwrap();

        let mut limiter = RateLimiter::default();
        let result = limiter
            .check(options(3, "1min").storage(StorageKind::External).external(store))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, 2);
    }

    #[tokio::test]
    async fn test_external_check_through_shared_ref() {
        let store = Arc::new(MemoryExternalStore::new());
        let limiter = RateLimiter::new(
            RateLimitDefaults::new()
                .storage(StorageKind::External)
                .external(store),
        );
        let opts = options(3, "1min");
        assert!(limiter.uses_external(&opts));

        let (a, b) = tokio::join!(
            limiter.check_external(opts.clone().key("a")),
            limiter.check_external(opts.clone().key("b")),
        );
        assert_eq!(a.unwrap().remaining, 2);
        assert_eq!(b.unwrap().remaining, 2);

        let again = limiter.check_external(opts.key("a")).await.unwrap();
        assert_eq!(again.remaining, 1);
    }

    #[tokio::test]
    async fn test_check_external_rejects_local_storage() {
        let limiter = RateLimiter::default();
        let opts = options(1, "1s");
        assert!(!limiter.uses_external(&opts));

        let err = limiter.check_external(opts).await.unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidRequest(_)));
    }
}
