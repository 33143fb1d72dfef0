pub mod cache;
pub mod catalog;
pub mod controller;
pub mod domain;
pub mod playlist;
pub mod ports;
pub mod session;
pub mod swipe;

pub use cache::{ArtistCache, ArtistCacheEntry};
pub use catalog::{present_artists, ArtistCatalog, ArtistSource, PreloadReport};
pub use controller::{SessionCommand, SessionController, SessionEvent, SessionHandle};
pub use domain::{
    AccessToken, ActionKind, Artist, CreatedPlaylist, DiscoveryRequest, PlaylistDraft, SongAction,
    TokenGrant, Track,
};
pub use playlist::export_playlist;
pub use ports::{AuthService, DiscoveryBackend, PortError, PortResult, TokenStore};
pub use session::{Advance, DiscoverySession, SessionPhase, SessionSnapshot};
pub use swipe::{classify_release, SwipeTracker};
