//! URL-keyed response cache with a fixed time to live.
//!
//! Entries are keyed by the request URL with the cache-busting `t` parameter
//! removed (see [`cache_key`]), so two calls differing only by their
//! timestamp share an entry. Expired entries are evicted lazily on the next
//! lookup of their key; there is no background sweep.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::{Captures, Regex};
use restbox_core::RestResponse;
use serde::Serialize;
use tracing::{debug, trace};

static CACHE_BUSTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&])t=\d*(&|$)").expect("cache buster pattern is valid")
});

/// How an exchange interacted with the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// The response was replayed from the cache.
    Hit,
    /// The request was eligible but not cached; the fresh response was stored.
    Miss,
    /// The cache was not consulted.
    #[default]
    Bypass,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

/// Source of the current time for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Starts at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(now.timestamp_millis())),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jumps to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Normalizes `url` into a cache key.
///
/// Removes the first `t=<digits>` parameter and repairs the separators
/// around it.
///
/// ```
/// use restbox::cache::cache_key;
///
/// assert_eq!(cache_key("/todos?t=1700000000000&done=true"), "/todos?done=true");
/// assert_eq!(cache_key("/todos?done=true&t=1700000000000"), "/todos?done=true");
/// assert_eq!(cache_key("/todos?t=1700000000000"), "/todos");
/// ```
pub fn cache_key(url: &str) -> String {
    CACHE_BUSTER
        .replace(url, |caps: &Captures<'_>| {
            if &caps[2] == "&" {
                caps[1].to_owned()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// A stored response and the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stored_at: DateTime<Utc>,
    pub response: RestResponse,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        let elapsed = i128::from(now.timestamp_millis() - self.stored_at.timestamp_millis());
        elapsed <= lifetime.as_millis() as i128
    }
}

/// Hit counters of a [`ResponseCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Hits across all keys.
    pub total: u64,
    /// Hits per cache key.
    pub by_key: BTreeMap<String, u64>,
}

/// In-memory store of responses to `GET` requests.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    hits: DashMap<String, u64>,
    total_hits: AtomicU64,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.len())
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Creates an empty cache keeping entries for `lifetime`.
    pub fn new(lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            hits: DashMap::new(),
            total_hits: AtomicU64::new(0),
            lifetime,
            clock,
        }
    }

    /// Time to live of an entry.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns `false` when the lifetime is zero.
    pub fn is_enabled(&self) -> bool {
        !self.lifetime.is_zero()
    }

    /// Looks up a fresh response for `url`.
    ///
    /// A hit returns a copy of the stored response and bumps the hit
    /// counters. An expired entry is evicted.
    pub fn get(&self, url: &str) -> Option<RestResponse> {
        let key = cache_key(url);
        let now = self.clock.now();

        let stored_at = {
            let entry = self.entries.get(&key)?;
            if entry.is_fresh(now, self.lifetime) {
                let response = entry.response.clone();
                drop(entry);
                self.total_hits.fetch_add(1, Ordering::Relaxed);
                *self.hits.entry(key.clone()).or_insert(0) += 1;
                trace!(key = %key, "cache hit");
                return Some(response);
            }
            entry.stored_at
        };

        // Another task may have stored a fresh entry meanwhile.
        if self
            .entries
            .remove_if(&key, |_, entry| entry.stored_at == stored_at)
            .is_some()
        {
            debug!(key = %key, "evicted expired cache entry");
        }
        None
    }

    /// Stores a copy of `response` for `url`, replacing any previous entry.
    pub fn set(&self, url: &str, response: &RestResponse) {
        let key = cache_key(url);
        trace!(key = %key, "cache store");
        self.entries.insert(
            key,
            CacheEntry {
                stored_at: self.clock.now(),
                response: response.clone(),
            },
        );
    }

    /// Snapshot of the hit counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total: self.total_hits.load(Ordering::Relaxed),
            by_key: self
                .hits
                .iter()
                .map(|hit| (hit.key().clone(), *hit.value()))
                .collect(),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Hit counters are kept.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
