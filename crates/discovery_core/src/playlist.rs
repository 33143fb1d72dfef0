//! crates/discovery_core/src/playlist.rs
//!
//! Exports the liked tracks of a finished session as an upstream playlist.

use tracing::info;

use crate::domain::{AccessToken, CreatedPlaylist, PlaylistDraft, Track};
use crate::ports::{DiscoveryBackend, PortError, PortResult};

/// Creates a playlist from `liked`. An empty selection is refused locally.
pub async fn export_playlist(
    backend: &dyn DiscoveryBackend,
    token: &AccessToken,
    name: &str,
    liked: &[Track],
) -> PortResult<CreatedPlaylist> {
    if liked.is_empty() {
        return Err(PortError::Unexpected(
            "Cannot create a playlist without any liked tracks".to_string(),
        ));
    }

    let name = match name.trim() {
        "" => "Discovery Mix",
        trimmed => trimmed,
    };
    let draft = PlaylistDraft {
        name: name.to_string(),
        tracks: liked.to_vec(),
    };

    let created = backend.create_playlist(token, &draft).await?;
    info!(name = %draft.name, tracks = draft.tracks.len(), url = %created.url, "Playlist created");
    Ok(created)
}
