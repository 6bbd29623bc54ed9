//! Time Parsing Module
//!
//! Converts human-readable durations ("30s", "2hours") into milliseconds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolkitError};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;
/// Average Gregorian month (30.436875 days)
const MONTH_MS: i64 = 2_629_746_000;
/// Average Gregorian year (365.2425 days)
const YEAR_MS: i64 = 31_556_952_000;

// == Time Spec ==
/// A duration given either as exact milliseconds or as a human string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Millis(i64),
    Human(String),
}

impl From<i64> for TimeSpec {
    fn from(ms: i64) -> Self {
        TimeSpec::Millis(ms)
    }
}

impl From<i32> for TimeSpec {
    fn from(ms: i32) -> Self {
        TimeSpec::Millis(ms.into())
    }
}

impl From<&str> for TimeSpec {
    fn from(s: &str) -> Self {
        TimeSpec::Human(s.to_string())
    }
}

impl From<String> for TimeSpec {
    fn from(s: String) -> Self {
        TimeSpec::Human(s)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Millis(ms) => write!(f, "{}ms", ms),
            TimeSpec::Human(s) => f.write_str(s),
        }
    }
}

// == Parse Time ==
/// Resolves a [`TimeSpec`] to milliseconds.
///
/// Numeric values pass through unchanged, including zero and negatives.
pub fn parse_time(spec: &TimeSpec) -> Result<i64> {
    match spec {
        TimeSpec::Millis(ms) => Ok(*ms),
        TimeSpec::Human(s) => parse_time_str(s),
    }
}

/// Parses `<digits><unit>` with no separating whitespace.
///
/// # Errors
/// Returns `InvalidFormat` for a missing number, a missing or unknown unit,
/// or a value that overflows `i64` milliseconds.
pub fn parse_time_str(value: &str) -> Result<i64> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    if digits.is_empty() || unit.is_empty() || !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolkitError::InvalidFormat(value.to_string()));
    }

    let amount: i64 = digits
        .parse()
        .map_err(|_| ToolkitError::InvalidFormat(value.to_string()))?;

    let factor = unit_factor(unit)
        .ok_or_else(|| ToolkitError::InvalidFormat(format!("unknown unit in {}", value)))?;

    amount
        .checked_mul(factor)
        .ok_or_else(|| ToolkitError::InvalidFormat(value.to_string()))
}

fn unit_factor(unit: &str) -> Option<i64> {
    let factor = match unit.to_ascii_lowercase().as_str() {
        "ms" | "millisecond" | "milliseconds" => 1,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND_MS,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE_MS,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR_MS,
        "d" | "day" | "days" => DAY_MS,
        "w" | "week" | "weeks" => WEEK_MS,
        "mo" | "month" | "months" => MONTH_MS,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR_MS,
        _ => return None,
    };
    Some(factor)
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
