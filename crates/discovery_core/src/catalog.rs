//! crates/discovery_core/src/catalog.rs
//!
//! Cache-backed artist lookup for workout categories, the display shuffle, and
//! the best-effort preload loop.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::ArtistCache;
use crate::domain::{AccessToken, Artist};
use crate::ports::{DiscoveryBackend, PortError, PortResult};

/// Where a returned artist list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistSource {
    Cache,
    Network,
}

/// Outcome of one preload pass.
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub fetched: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<(String, PortError)>,
    pub cancelled: bool,
}

pub struct ArtistCatalog {
    backend: Arc<dyn DiscoveryBackend>,
    cache: Arc<ArtistCache>,
}

impl ArtistCatalog {
    pub fn new(backend: Arc<dyn DiscoveryBackend>, cache: Arc<ArtistCache>) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &ArtistCache {
        &self.cache
    }

    /// Get-or-fetch. A fetch failure leaves the cache untouched and is returned as-is.
    pub async fn artists_for(
        &self,
        token: &AccessToken,
        workout: &str,
        mood: &str,
    ) -> PortResult<Vec<Artist>> {
        self.lookup(token, workout, mood).await.map(|(artists, _)| artists)
    }

    async fn lookup(
        &self,
        token: &AccessToken,
        workout: &str,
        mood: &str,
    ) -> PortResult<(Vec<Artist>, ArtistSource)> {
        if let Some(artists) = self.cache.get(workout) {
            info!(workout = %workout, count = artists.len(), "Artist cache hit");
            return Ok((artists, ArtistSource::Cache));
        }

        info!(workout = %workout, mood = %mood, "Artist cache miss, fetching from backend");
        let artists = self.backend.fetch_artists(token, workout, mood).await?;
        self.cache.put(workout, artists.clone());
        Ok((artists, ArtistSource::Network))
    }

    /// Walks every workout in order doing get-or-fetch, sleeping `delay` before each
    /// network request after the first. One workout failing never stops the others.
    pub async fn preload(
        &self,
        token: &AccessToken,
        workouts: &[String],
        mood: &str,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> PreloadReport {
        let mut report = PreloadReport::default();
        let mut requested_before = false;

        for workout in workouts {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if self.cache.get(workout).is_some() {
                report.cached.push(workout.clone());
                continue;
            }

            if requested_before && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            requested_before = true;

            match self.lookup(token, workout, mood).await {
                Ok((_, ArtistSource::Cache)) => report.cached.push(workout.clone()),
                Ok((_, ArtistSource::Network)) => report.fetched.push(workout.clone()),
                Err(e) => {
                    warn!(workout = %workout, error = %e, "Preload failed for workout");
                    report.failed.push((workout.clone(), e));
                }
            }
        }

        info!(
            fetched = report.fetched.len(),
            cached = report.cached.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Artist preload finished"
        );
        report
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

/// Display step applied by callers: an independent shuffle, then the first
/// `display_count` artists. The cached list is never modified.
pub fn present_artists(artists: &[Artist], display_count: usize) -> Vec<Artist> {
    let mut shown = artists.to_vec();
    shown.shuffle(&mut rand::thread_rng());
    shown.truncate(display_count);
    shown
}
