//! Request DTOs for the toolkit API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::CacheOptions;
use crate::storage::StorageKind;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /cache)
///
/// Cache options sit beside the key and value:
/// `{"key": "k", "value": {...}, "ttl": "30s", "maxUses": 3}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Per-call overrides of the server's cache defaults
    #[serde(flatten)]
    pub options: CacheOptions,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Optional `?storage=` selector on cache routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageQuery {
    #[serde(default)]
    pub storage: Option<StorageKind>,
}
