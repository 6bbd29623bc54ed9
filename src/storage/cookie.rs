//! Cookie Storage Module
//!
//! Each record becomes one cookie: `name=urlencoded(json); expires=<date>; path=/`.
//! Without a TTL hint the cookie is a session cookie.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::{StorageAdapter, StorageKind};

/// Date format used by `Date.prototype.toUTCString`
const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Upper bound applied to `Max-Age` (400 days, as browsers cap it)
const MAX_AGE_LIMIT_SECS: i64 = 400 * 24 * 60 * 60;

// == Cookie Document ==
/// The `document.cookie` accessor pair.
pub trait CookieDocument: Send + Sync {
    /// Returns visible cookies as `name=value; name2=value2`.
    fn cookie(&self) -> String;
    /// Applies one cookie assignment string.
    fn set_cookie(&self, assignment: &str);
}

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(true, |at| at > now)
    }
}

// == Cookie Jar ==
/// Process-local stand-in for `document.cookie`.
///
/// Understands the `expires` and `Max-Age` attributes; other attributes are ignored.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the expiry recorded for a cookie, if any.
    pub fn expires(&self, name: &str) -> Option<DateTime<Utc>> {
        self.cookies
            .lock()
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.expires)
    }
}

impl CookieDocument for CookieJar {
    fn cookie(&self) -> String {
        let now = Utc::now();
        let mut cookies = self.cookies.lock();
        cookies.retain(|c| c.is_live(now));
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, assignment: &str) {
        let mut parts = assignment.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            return;
        }

        let mut expires = None;
        for attr in parts {
            let Some((attr_name, attr_value)) = attr.split_once('=') else {
                continue;
            };
            let attr_value = attr_value.trim();
            match attr_name.trim().to_ascii_lowercase().as_str() {
                "max-age" => {
                    if let Ok(secs) = attr_value.parse::<i64>() {
                        let secs = secs.clamp(-MAX_AGE_LIMIT_SECS, MAX_AGE_LIMIT_SECS);
                        expires = Utc::now().checked_add_signed(Duration::seconds(secs));
                    }
                }
                // Max-Age wins over expires
                "expires" if expires.is_none() => {
                    expires = NaiveDateTime::parse_from_str(attr_value, COOKIE_DATE_FORMAT)
                        .ok()
                        .map(|dt| dt.and_utc());
                }
                _ => {}
            }
        }

        let mut cookies = self.cookies.lock();
        cookies.retain(|c| c.name != name);
        let cookie = StoredCookie {
            name,
            value: value.trim().to_string(),
            expires,
        };
        if cookie.is_live(Utc::now()) {
            cookies.push(cookie);
        }
    }
}

/// Splits a `document.cookie` string into `(name, value)` pairs.
fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let pair = pair.trim();
        match pair.split_once('=') {
            Some((name, value)) => Some((name.trim(), value)),
            None if !pair.is_empty() => Some((pair, "")),
            None => None,
        }
    })
}

// == Cookie Adapter ==
/// Namespaced JSON adapter over a [`CookieDocument`].
pub struct CookieAdapter<T> {
    document: Option<Arc<dyn CookieDocument>>,
    prefix: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> CookieAdapter<T> {
    pub fn new(document: Option<Arc<dyn CookieDocument>>, prefix: &'static str) -> Self {
        Self {
            document,
            prefix,
            _record: PhantomData,
        }
    }

    fn cookie_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, urlencoding::encode(key))
    }

    fn raw_value(&self, key: &str) -> Option<String> {
        let document = self.document.as_ref()?;
        let name = self.cookie_name(key);
        let header = document.cookie();
        let value = parse_cookie_header(&header)
            .find(|(n, v)| *n == name && !v.is_empty())
            .map(|(_, v)| v.to_string())?;
        urlencoding::decode(&value).ok().map(|v| v.into_owned())
    }
}

impl<T: Serialize + DeserializeOwned> StorageAdapter<T> for CookieAdapter<T> {
    fn kind(&self) -> StorageKind {
        StorageKind::Cookies
    }

    fn is_available(&self) -> bool {
        self.document.is_some()
    }

    fn read(&self, key: &str) -> Option<T> {
        let raw = self.raw_value(key)?;
        serde_json::from_str(&raw).ok()
    }

    fn write(&mut self, key: &str, value: &T, ttl_hint_ms: Option<i64>) {
        let Some(document) = self.document.as_ref() else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Failed to serialize cookie record for {}: {}", key, err);
                return;
            }
        };

        // Cookie dates have whole-second precision; round up so the cookie
        // never expires before the record it carries.
        let expires = ttl_hint_ms
            .and_then(|ttl| {
                Utc::now().checked_add_signed(Duration::milliseconds(ttl.saturating_add(999)))
            })
            .map(|at| format!("; expires={}", at.format(COOKIE_DATE_FORMAT)))
            .unwrap_or_default();

        document.set_cookie(&format!(
            "{}={}{}; path=/",
            self.cookie_name(key),
            urlencoding::encode(&raw),
            expires
        ));
    }

    fn remove(&mut self, key: &str) {
        if let Some(document) = self.document.as_ref() {
            document.set_cookie(&format!("{}=; Max-Age=0; path=/", self.cookie_name(key)));
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(document) = self.document.as_ref() else {
            return Vec::new();
        };
        let header = document.cookie();
        parse_cookie_header(&header)
            .filter_map(|(name, _)| name.strip_prefix(self.prefix))
            .filter_map(|encoded| urlencoding::decode(encoded).ok().map(|k| k.into_owned()))
            .collect()
    }

    fn clear(&mut self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }
}
