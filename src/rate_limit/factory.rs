//! Keyed Rate Limit Factory
//!
//! Curries limit, interval and a key prefix so callers only pass the
//! identity being limited.

use crate::error::Result;
use crate::rate_limit::{RateLimitDefaults, RateLimitOptions, RateLimitResult, RateLimiter};
use crate::time::{parse_time, TimeSpec};

// == Keyed Rate Limit ==
/// A limiter bound to fixed parameters; keys are `prefix:value`.
pub struct KeyedRateLimit {
    limiter: RateLimiter,
    limit: u64,
    interval_ms: i64,
    prefix: String,
}

impl KeyedRateLimit {
    /// Binds an existing limiter, e.g. one built with a client context.
    ///
    /// # Errors
    /// `InvalidFormat` if `interval` does not parse.
    pub fn from_limiter(
        limiter: RateLimiter,
        limit: u64,
        interval: impl Into<TimeSpec>,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            limiter,
            limit,
            interval_ms: parse_time(&interval.into())?,
            prefix: prefix.into(),
        })
    }

    /// Checks one request for `value`.
    pub async fn limit(&mut self, value: &str) -> Result<RateLimitResult> {
        let options = RateLimitOptions::new(self.limit, self.interval_ms)
            .key(format!("{}:{}", self.prefix, value));
        self.limiter.check(options).await
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

// == Create Rate Limit ==
/// Builds a [`KeyedRateLimit`] over a fresh limiter.
///
/// `defaults` supplies block duration, storage, logging and the external
/// client; storage falls back to memory.
pub fn create_rate_limit(
    limit: u64,
    interval: impl Into<TimeSpec>,
    prefix: impl Into<String>,
    defaults: RateLimitDefaults,
) -> Result<KeyedRateLimit> {
    KeyedRateLimit::from_limiter(RateLimiter::new(defaults), limit, interval, prefix)
}
