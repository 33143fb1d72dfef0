//! services/api/src/web/protocol.rs
//!
//! Defines the wire types shared by the REST endpoints and the WebSocket
//! protocol between a front end and the discovery bridge.

use discovery_core::controller::SessionEvent;
use discovery_core::domain::{Artist, Track};
use discovery_core::session::SessionSnapshot;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Shared DTOs
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ArtistDto {
    pub id: String,
    pub name: String,
    pub image_urls: Vec<String>,
    pub genres: Vec<String>,
}

impl From<Artist> for ArtistDto {
    fn from(artist: Artist) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            image_urls: artist.image_urls,
            genres: artist.genres,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TrackDto {
    pub id: String,
    pub isrc: String,
    pub name: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
}

impl From<Track> for TrackDto {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            isrc: track.isrc,
            name: track.name,
            artists: track.artists,
            album_art_url: track.album_art_url,
            preview_url: track.preview_url,
            genres: track.genres,
            popularity: track.popularity,
        }
    }
}

impl From<TrackDto> for Track {
    fn from(dto: TrackDto) -> Self {
        Self {
            id: dto.id,
            isrc: dto.isrc,
            name: dto.name,
            artists: dto.artists,
            album_art_url: dto.album_art_url,
            preview_url: dto.preview_url,
            genres: dto.genres,
            popularity: dto.popularity,
        }
    }
}

fn tracks_to_dto(tracks: Vec<Track>) -> Vec<TrackDto> {
    tracks.into_iter().map(TrackDto::from).collect()
}

//=========================================================================================
// Messages Sent FROM the Client TO the Bridge
//=========================================================================================

/// Represents the structured text messages a client can send over `/ws/discovery`.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts (or resumes) discovery for the selected seed artists.
    /// This must be the first message sent on the connection.
    Start {
        workout: String,
        artist_names: Vec<String>,
    },

    /// Horizontal drag movement on the top card, in pixels.
    Drag { delta: f32 },

    /// The drag gesture ended.
    DragRelease,

    Like,

    Dislike,

    /// Fetches a fresh track list and discards progress.
    Restart,
}

//=========================================================================================
// Messages Sent FROM the Bridge TO the Client
//=========================================================================================

/// Represents the structured text messages the bridge sends to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full session state; sent after every change.
    State {
        session_id: Uuid,
        current_index: usize,
        total: usize,
        current: Option<TrackDto>,
        liked: Vec<TrackDto>,
        awaiting: bool,
        complete: bool,
    },

    ActionRecorded { isrc: String, action: String },

    /// Non-fatal; the session has already moved on. Suitable for a toast.
    ActionFailed { isrc: String, action: String, message: String },

    SessionComplete { liked: Vec<TrackDto> },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}

impl From<SessionSnapshot> for ServerMessage {
    fn from(snapshot: SessionSnapshot) -> Self {
        ServerMessage::State {
            session_id: snapshot.session_id,
            current_index: snapshot.current_index,
            total: snapshot.total,
            current: snapshot.current.map(TrackDto::from),
            liked: tracks_to_dto(snapshot.liked),
            awaiting: snapshot.awaiting,
            complete: snapshot.complete,
        }
    }
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::ActionRecorded { action, .. } => ServerMessage::ActionRecorded {
                isrc: action.isrc,
                action: action.action.to_string(),
            },
            SessionEvent::ActionFailed { action, error } => ServerMessage::ActionFailed {
                isrc: action.isrc,
                action: action.action.to_string(),
                message: error.to_string(),
            },
            SessionEvent::Completed { liked } => ServerMessage::SessionComplete {
                liked: tracks_to_dto(liked),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::domain::{ActionKind, SongAction};
    use discovery_core::ports::PortError;
    use serde_json::json;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let start: ClientMessage = serde_json::from_value(json!({
            "type": "start",
            "workout": "cardio",
            "artist_names": ["Alpha"]
        }))
        .unwrap();
        assert!(matches!(start, ClientMessage::Start { ref workout, .. } if workout == "cardio"));

        let drag: ClientMessage =
            serde_json::from_value(json!({ "type": "drag", "delta": -12.5 })).unwrap();
        assert!(matches!(drag, ClientMessage::Drag { delta } if delta == -12.5));

        let release: ClientMessage =
            serde_json::from_value(json!({ "type": "drag_release" })).unwrap();
        assert!(matches!(release, ClientMessage::DragRelease));
    }

    #[test]
    fn failed_action_event_serializes_for_a_toast() {
        let event = SessionEvent::ActionFailed {
            action: SongAction {
                isrc: "X".to_string(),
                song_name: "S".to_string(),
                artist: "A".to_string(),
                genres: vec![],
                action: ActionKind::Like,
            },
            error: PortError::Unauthorized,
        };
        let value = serde_json::to_value(ServerMessage::from(event)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "action_failed", "isrc": "X", "action": "like", "message": "Unauthorized" })
        );
    }
}
