//! Mini Toolkit - caching and rate limiting utilities
//!
//! A multi-backend key/value cache with TTL and use-count expiry, a
//! fixed-window rate limiter with block durations, and a small HTTP server
//! exposing both.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod storage;
pub mod time;

pub use api::AppState;
pub use cache::{cache_function, Cache, CacheOptions};
pub use config::Config;
pub use error::{Result, ToolkitError};
pub use rate_limit::{create_rate_limit, RateLimitOptions, RateLimiter};
pub use time::{parse_time, TimeSpec};
