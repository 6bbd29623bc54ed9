//! Function Memoization
//!
//! Caches a function's return value keyed by `name:json(args)`.
//!
//! Two functions registered under the same name share cache slots, and
//! arguments that serialize identically collide. Callers pick distinct names.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{Cache, CacheOptions};
use crate::error::Result;
use crate::time::TimeSpec;

/// TTL used when a memoized function does not specify one.
pub const DEFAULT_MEMO_TTL: &str = "30s";

static GLOBAL_CACHE: OnceLock<Arc<Mutex<Cache>>> = OnceLock::new();

// == Global Cache ==
/// Process-wide cache shared by [`cache_function`].
pub fn global_cache() -> Arc<Mutex<Cache>> {
    GLOBAL_CACHE
        .get_or_init(|| Arc::new(Mutex::new(Cache::default())))
        .clone()
}

// == Cache Function ==
/// Wraps `f` so repeated calls with equal arguments reuse the global cache.
pub fn cache_function<A, R, F>(
    name: &'static str,
    ttl: impl Into<TimeSpec>,
    f: F,
) -> impl Fn(A) -> Result<R>
where
    A: Serialize,
    R: Serialize + DeserializeOwned,
    F: Fn(A) -> R,
{
    cache_function_with(global_cache(), name, ttl, f)
}

/// Like [`cache_function`] but backed by an explicit cache.
///
/// The lock is released while `f` runs, so `f` may itself use the cache.
pub fn cache_function_with<A, R, F>(
    cache: Arc<Mutex<Cache>>,
    name: &'static str,
    ttl: impl Into<TimeSpec>,
    f: F,
) -> impl Fn(A) -> Result<R>
where
    A: Serialize,
    R: Serialize + DeserializeOwned,
    F: Fn(A) -> R,
{
    let ttl = ttl.into();
    move |args: A| -> Result<R> {
        let key = format!("{}:{}", name, serde_json::to_string(&args)?);

        if let Some(hit) = cache.lock().get::<R>(&key, None)? {
            return Ok(hit);
        }

        let result = f(args);
        cache
            .lock()
            .set(&key, &result, Some(CacheOptions::new().ttl(ttl.clone())))?;
        Ok(result)
    }
}
