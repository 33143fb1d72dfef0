//! crates/discovery_core/src/domain.rs
//!
//! Defines the pure, core data structures for the discovery client.
//! These structs are independent of any transport or serialization format.

use std::fmt;

use crate::ports::{PortError, PortResult};

/// An artist as returned by the backend for a workout/mood pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub image_urls: Vec<String>,
    pub genres: Vec<String>,
}

/// A candidate track presented during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub isrc: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_art_url: Option<String>,
    pub preview_url: Option<String>,
    pub genres: Vec<String>,
    pub popularity: u32,
}

impl Track {
    /// The artist credit shown on a card and sent with an action.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// The user's verdict on a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Like,
    Dislike,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Like => "like",
            ActionKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request value recorded with the backend for each decision. Built per swipe, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongAction {
    pub isrc: String,
    pub song_name: String,
    pub artist: String,
    pub genres: Vec<String>,
    pub action: ActionKind,
}

impl SongAction {
    pub fn from_track(track: &Track, action: ActionKind) -> Self {
        Self {
            isrc: track.isrc.clone(),
            song_name: track.name.clone(),
            artist: track.artist_line(),
            genres: track.genres.clone(),
            action,
        }
    }

    /// Genres in the comma-joined form the backend expects.
    pub fn joined_genres(&self) -> String {
        self.genres.join(",")
    }
}

/// Seed artists plus workout for a discovery (or playlist preview) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub artist_names: Vec<String>,
    pub workout: String,
}

/// A playlist to be created upstream from the liked tracks of a session.
#[derive(Debug, Clone)]
pub struct PlaylistDraft {
    pub name: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub url: String,
}

/// Tokens handed back by the upstream OAuth exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in_secs: Option<u64>,
}

/// A non-blank bearer token. Construction is the local precondition check:
/// a missing or blank token never reaches the network.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn parse(raw: Option<&str>) -> PortResult<Self> {
        match raw.map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Self(token.to_string())),
            _ => Err(PortError::MissingToken),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: "t1".to_string(),
            isrc: "USRC17607839".to_string(),
            name: "Run".to_string(),
            artists: vec!["Foo".to_string(), "Bar".to_string()],
            album_art_url: None,
            preview_url: None,
            genres: vec!["pop".to_string(), "dance pop".to_string()],
            popularity: 71,
        }
    }

    #[test]
    fn song_action_carries_track_fields() {
        let action = SongAction::from_track(&track(), ActionKind::Like);
        assert_eq!(action.isrc, "USRC17607839");
        assert_eq!(action.artist, "Foo, Bar");
        assert_eq!(action.joined_genres(), "pop,dance pop");
        assert_eq!(action.action.as_str(), "like");
    }

    #[test]
    fn blank_token_is_a_precondition_failure() {
        assert!(matches!(AccessToken::parse(None), Err(PortError::MissingToken)));
        assert!(matches!(AccessToken::parse(Some("   ")), Err(PortError::MissingToken)));
        let token = AccessToken::parse(Some(" abc ")).unwrap();
        assert_eq!(token.as_str(), "abc");
        assert_eq!(format!("{:?}", token), "AccessToken(***)");
    }
}
