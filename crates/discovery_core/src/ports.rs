//! crates/discovery_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the client's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete HTTP backend and token persistence.

use async_trait::async_trait;

use crate::domain::{
    AccessToken, Artist, CreatedPlaylist, DiscoveryRequest, PlaylistDraft, SongAction,
    TokenGrant, Track,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// Detected locally; no request was sent.
    #[error("No access token available, please sign in")]
    MissingToken,
    #[error("Backend responded with {status}: {message}")]
    Http { status: u16, message: String },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote discovery backend, treated as an opaque HTTP service.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    async fn fetch_artists(
        &self,
        token: &AccessToken,
        workout: &str,
        mood: &str,
    ) -> PortResult<Vec<Artist>>;

    async fn discover_tracks(
        &self,
        token: &AccessToken,
        request: &DiscoveryRequest,
    ) -> PortResult<Vec<Track>>;

    /// Records a like/dislike. Returns the backend's status message.
    async fn record_action(&self, token: &AccessToken, action: &SongAction) -> PortResult<String>;

    async fn preview_playlist(
        &self,
        token: &AccessToken,
        request: &DiscoveryRequest,
    ) -> PortResult<Vec<Track>>;

    async fn create_playlist(
        &self,
        token: &AccessToken,
        draft: &PlaylistDraft,
    ) -> PortResult<CreatedPlaylist>;
}

/// Token exchange and refresh for the upstream music-service OAuth flow.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> PortResult<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> PortResult<TokenGrant>;
}

/// A small name/value store that survives process restarts.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, name: &str) -> PortResult<Option<String>>;

    async fn set(&self, name: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, name: &str) -> PortResult<()>;
}

/// Key under which the upstream access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key under which the upstream refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
