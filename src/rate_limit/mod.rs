//! Rate Limit Module
//!
//! Fixed-window request limiting with a block-duration cooldown, over
//! in-process, browser and external backends.

mod factory;
mod limiter;
mod options;


pub use factory::{create_rate_limit, KeyedRateLimit};
pub use limiter::RateLimiter;
pub use options::{
    RateLimitDefaults, RateLimitOptions, RateLimitRecord, RateLimitResult, DEFAULT_KEY,
};

// == Public Constants ==
/// Namespace for counters kept in browser storage
pub const RATE_LIMIT_KEY_PREFIX: &str = "mtk.ratelimit.";

/// Namespace for counters kept in the external store
pub const EXTERNAL_KEY_PREFIX: &str = "mtk:ratelimit:";
