//! crates/discovery_core/src/cache.rs
//!
//! In-memory, TTL-bounded cache of artist lists keyed by workout category.
//!
//! The cache stores exactly what the backend returned. Shuffling and truncation
//! for display happen at the caller (see `catalog::present_artists`), so repeated
//! reads of a live entry can each be presented differently without a refetch.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::Artist;

#[derive(Debug, Clone)]
pub struct ArtistCacheEntry {
    pub workout_key: String,
    pub artists: Vec<Artist>,
    pub fetched_at: DateTime<Utc>,
}

impl ArtistCacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, ArtistCacheEntry>,
    last_put: Option<DateTime<Utc>>,
}

/// Process-wide artist cache. Construct once and share behind an `Arc`.
pub struct ArtistCache {
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl ArtistCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached list if present and unexpired. A miss is `None`, not an error.
    pub fn get(&self, workout_key: &str) -> Option<Vec<Artist>> {
        self.get_at(workout_key, Utc::now())
    }

    pub fn get_at(&self, workout_key: &str, now: DateTime<Utc>) -> Option<Vec<Artist>> {
        let inner = self.lock();
        match inner.entries.get(workout_key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.artists.clone()),
            Some(_) => {
                debug!(workout = %workout_key, "Artist cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Overwrites any entry for `workout_key`, stamped with the current time.
    pub fn put(&self, workout_key: &str, artists: Vec<Artist>) {
        self.put_at(workout_key, artists, Utc::now());
    }

    pub fn put_at(&self, workout_key: &str, artists: Vec<Artist>, fetched_at: DateTime<Utc>) {
        let mut inner = self.lock();
        debug!(workout = %workout_key, count = artists.len(), "Caching artists");
        inner.entries.insert(
            workout_key.to_string(),
            ArtistCacheEntry {
                workout_key: workout_key.to_string(),
                artists,
                fetched_at,
            },
        );
        inner.last_put = Some(match inner.last_put {
            Some(prev) if prev > fetched_at => prev,
            _ => fetched_at,
        });
    }

    /// Whether the most recent write is still inside the freshness window.
    /// Diagnostic only; per-key reads use `get`.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.lock()
            .last_put
            .map(|at| now - at < self.ttl)
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.last_put = None;
        debug!("Artist cache cleared");
    }

    // The map holds plain data, so a poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
