//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use discovery_core::cache::ArtistCache;
use discovery_core::catalog::ArtistCatalog;
use discovery_core::domain::AccessToken;
use discovery_core::ports::{
    AuthService, DiscoveryBackend, PortResult, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn DiscoveryBackend>,
    pub auth: Arc<dyn AuthService>,
    pub tokens: Arc<dyn TokenStore>,
    pub catalog: Arc<ArtistCatalog>,
    /// Cancelled at shutdown and on logout; background preloads watch it.
    pub shutdown: CancellationToken,
    /// Current preload generation; replaced on logout so later preloads can run.
    pub preload_cancel: Arc<std::sync::Mutex<CancellationToken>>,
    /// Set while a preload task is running; at most one runs at a time.
    preload_running: Arc<AtomicBool>,
}

/// Marks a preload as running until dropped.
pub struct PreloadGuard {
    running: Arc<AtomicBool>,
}

impl Drop for PreloadGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn DiscoveryBackend>,
        auth: Arc<dyn AuthService>,
        tokens: Arc<dyn TokenStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let cache = Arc::new(ArtistCache::new(config.artist_cache_ttl));
        let catalog = Arc::new(ArtistCatalog::new(backend.clone(), cache));
        let preload_cancel = Arc::new(std::sync::Mutex::new(shutdown.child_token()));
        Self {
            config,
            backend,
            auth,
            tokens,
            catalog,
            shutdown,
            preload_cancel,
            preload_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the preload slot. `None` while another preload is still running.
    pub fn begin_preload(&self) -> Option<PreloadGuard> {
        self.preload_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PreloadGuard {
                running: self.preload_running.clone(),
            })
    }

    pub fn preload_in_progress(&self) -> bool {
        self.preload_running.load(Ordering::Acquire)
    }

    /// The persisted upstream token, if any.
    pub async fn stored_token(&self) -> PortResult<Option<AccessToken>> {
        let raw = self.tokens.get(ACCESS_TOKEN_KEY).await?;
        Ok(AccessToken::parse(raw.as_deref()).ok())
    }

    pub fn preload_token(&self) -> CancellationToken {
        self.preload_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Logout: stops preloads, empties the artist cache and forgets stored tokens.
    pub async fn sign_out(&self) -> PortResult<()> {
        {
            let mut current = self
                .preload_cancel
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            current.cancel();
            *current = self.shutdown.child_token();
        }
        self.catalog.clear();
        self.tokens.remove(ACCESS_TOKEN_KEY).await?;
        self.tokens.remove(REFRESH_TOKEN_KEY).await?;
        Ok(())
    }
}
