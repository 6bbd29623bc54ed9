//! Cache Module
//!
//! Key/value caching with TTL and use-count expiry over pluggable storage
//! backends, plus lifecycle events and function memoization.

mod entry;
mod events;
mod memoize;
mod options;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use events::{CacheEvent, CacheEventKind, CacheListener, EventBus};
pub use memoize::{cache_function, cache_function_with, global_cache, DEFAULT_MEMO_TTL};
pub use options::{CacheOptions, LogMode, MaxUses, DEFAULT_TTL_MS};
pub use store::Cache;

// == Public Constants ==
/// Namespace for cache keys written to client storage and cookies
pub const CACHE_KEY_PREFIX: &str = "mtk.cache.";
