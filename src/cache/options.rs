//! Cache Options Module
//!
//! Instance defaults and per-call overrides, shallow-merged with the call winning.

use serde::{Deserialize, Serialize};

use crate::storage::StorageKind;
use crate::time::TimeSpec;

/// Default instance TTL when none is configured (one minute).
pub const DEFAULT_TTL_MS: i64 = 60_000;

// == Max Uses ==
/// Read budget for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "MaxUsesRepr", into = "MaxUsesRepr")]
pub enum MaxUses {
    Limited(u64),
    #[default]
    Unbounded,
}

impl MaxUses {
    /// Budget as stored on an entry; zero is treated as unbounded.
    pub fn limit(&self) -> Option<u64> {
        match self {
            MaxUses::Limited(0) | MaxUses::Unbounded => None,
            MaxUses::Limited(n) => Some(*n),
        }
    }
}

impl From<u64> for MaxUses {
    fn from(n: u64) -> Self {
        MaxUses::Limited(n)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxUsesRepr {
    Count(u64),
    Word(String),
}

impl TryFrom<MaxUsesRepr> for MaxUses {
    type Error = String;

    fn try_from(repr: MaxUsesRepr) -> Result<Self, Self::Error> {
        match repr {
            MaxUsesRepr::Count(n) => Ok(MaxUses::Limited(n)),
            MaxUsesRepr::Word(w) if w.eq_ignore_ascii_case("unbounded") => Ok(MaxUses::Unbounded),
            MaxUsesRepr::Word(w) => Err(format!("invalid maxUses: {}", w)),
        }
    }
}

impl From<MaxUses> for MaxUsesRepr {
    fn from(max: MaxUses) -> Self {
        match max {
            MaxUses::Limited(n) => MaxUsesRepr::Count(n),
            MaxUses::Unbounded => MaxUsesRepr::Word("unbounded".to_string()),
        }
    }
}

// == Log Mode ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    #[default]
    #[serde(rename = "none")]
    Off,
    /// Log every successful read
    Usage,
}

// == Cache Options ==
/// Partial cache configuration; unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    #[serde(default)]
    pub ttl: Option<TimeSpec>,
    #[serde(default)]
    pub max_uses: Option<MaxUses>,
    #[serde(default)]
    pub storage: Option<StorageKind>,
    #[serde(default)]
    pub logs: Option<LogMode>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults used by `Cache::default()`: one-minute TTL, unbounded uses, memory.
    pub fn instance_defaults() -> Self {
        Self {
            ttl: Some(TimeSpec::Millis(DEFAULT_TTL_MS)),
            max_uses: Some(MaxUses::Unbounded),
            storage: Some(StorageKind::Memory),
            logs: Some(LogMode::Off),
        }
    }

    pub fn ttl(mut self, ttl: impl Into<TimeSpec>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    pub fn max_uses(mut self, max_uses: u64) -> Self {
        self.max_uses = Some(MaxUses::Limited(max_uses));
        self
    }

    pub fn unbounded_uses(mut self) -> Self {
        self.max_uses = Some(MaxUses::Unbounded);
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn logs(mut self, logs: LogMode) -> Self {
        self.logs = Some(logs);
        self
    }

    // == Merge ==
    /// Overlays `call` on top of `self`; set fields in `call` win.
    pub fn merge(&self, call: &CacheOptions) -> CacheOptions {
        CacheOptions {
            ttl: call.ttl.clone().or_else(|| self.ttl.clone()),
            max_uses: call.max_uses.or(self.max_uses),
            storage: call.storage.or(self.storage),
            logs: call.logs.or(self.logs),
        }
    }
}
