//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::cache::{CacheOptions, LogMode, MaxUses};
use crate::rate_limit::{RateLimitDefaults, RateLimitOptions};
use crate::storage::StorageKind;
use crate::time::TimeSpec;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Default cache entry lifetime
    pub cache_ttl: TimeSpec,
    /// Default read budget for cache entries
    pub cache_max_uses: MaxUses,
    /// Cache usage logging
    pub cache_logs: LogMode,
    /// Requests allowed per window on `/limit`
    pub rate_limit: u64,
    /// Rate limit window length
    pub rate_limit_interval: TimeSpec,
    /// Cooldown once a window fills, None = same as the interval
    pub rate_limit_block: Option<TimeSpec>,
    /// Backend holding rate limit counters
    pub rate_limit_storage: StorageKind,
    /// Redis connection string for the external backend
    pub redis_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_TTL` - Default TTL, ms or human string (default: 60s)
    /// - `CACHE_MAX_USES` - Read budget or `unbounded` (default: unbounded)
    /// - `CACHE_LOGS` - `none` or `usage` (default: none)
    /// - `RATE_LIMIT` - Requests per window (default: 100)
    /// - `RATE_LIMIT_INTERVAL` - Window length (default: 1min)
    /// - `RATE_LIMIT_BLOCK` - Block duration (default: the interval)
    /// - `RATE_LIMIT_STORAGE` - `memory` or `redis` (default: memory)
    /// - `REDIS_URL` - Redis connection string (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any name lookup; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cache_ttl: lookup("CACHE_TTL")
                .map(|v| time_spec(&v))
                .unwrap_or(defaults.cache_ttl),
            cache_max_uses: lookup("CACHE_MAX_USES")
                .and_then(|v| max_uses(&v))
                .unwrap_or(defaults.cache_max_uses),
            cache_logs: match lookup("CACHE_LOGS").as_deref() {
                Some("usage") => LogMode::Usage,
                _ => defaults.cache_logs,
            },
            rate_limit: lookup("RATE_LIMIT")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.rate_limit),
            rate_limit_interval: lookup("RATE_LIMIT_INTERVAL")
                .map(|v| time_spec(&v))
                .unwrap_or(defaults.rate_limit_interval),
            rate_limit_block: lookup("RATE_LIMIT_BLOCK").map(|v| time_spec(&v)),
            rate_limit_storage: lookup("RATE_LIMIT_STORAGE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_storage),
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
        }
    }

    /// Instance defaults for the server's cache.
    pub fn cache_defaults(&self) -> CacheOptions {
        CacheOptions {
            ttl: Some(self.cache_ttl.clone()),
            max_uses: Some(self.cache_max_uses),
            storage: Some(StorageKind::Memory),
            logs: Some(self.cache_logs),
        }
    }

    /// Instance defaults for the server's rate limiter.
    pub fn rate_limit_defaults(&self) -> RateLimitDefaults {
        RateLimitDefaults {
            block_duration: self.rate_limit_block.clone(),
            storage: Some(self.rate_limit_storage),
            key: None,
            logs: Some(true),
            external: None,
        }
    }

    /// Per-request options for `key` using the configured limit and window.
    pub fn rate_limit_options(&self, key: &str) -> RateLimitOptions {
        RateLimitOptions::new(self.rate_limit, self.rate_limit_interval.clone()).key(key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_ttl: TimeSpec::from("60s"),
            cache_max_uses: MaxUses::Unbounded,
            cache_logs: LogMode::Off,
            rate_limit: 100,
            rate_limit_interval: TimeSpec::from("1min"),
            rate_limit_block: None,
            rate_limit_storage: StorageKind::Memory,
            redis_url: None,
        }
    }
}

/// Plain integers are milliseconds; anything else is a human duration.
fn time_spec(value: &str) -> TimeSpec {
    match value.parse::<i64>() {
        Ok(ms) => TimeSpec::Millis(ms),
        Err(_) => TimeSpec::Human(value.to_string()),
    }
}

fn max_uses(value: &str) -> Option<MaxUses> {
    if value.eq_ignore_ascii_case("unbounded") {
        return Some(MaxUses::Unbounded);
    }
    value.parse::<u64>().ok().map(MaxUses::Limited)
}
