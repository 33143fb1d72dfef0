//! services/api/src/adapters/backend.rs
//!
//! This module contains the HTTP adapter for the remote discovery backend.
//! It implements the `DiscoveryBackend` port from the `core` crate using `reqwest`.

use async_trait::async_trait;
use discovery_core::domain::{
    AccessToken, Artist, CreatedPlaylist, DiscoveryRequest, PlaylistDraft, SongAction, Track,
};
use discovery_core::ports::{DiscoveryBackend, PortError, PortResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `DiscoveryBackend` port over HTTP.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: Client,
    base_url: String,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter`. `base_url` has no trailing slash.
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
    ) -> PortResult<T> {
        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Request failed: {}", e)))?;
        parse_json(check_status(response).await?).await
    }
}

/// Maps a non-2xx response onto the port error taxonomy.
pub(crate) async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), %message, "Backend returned an error status");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        _ => PortError::Http {
            status: status.as_u16(),
            message,
        },
    })
}

pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to parse backend response: {}", e)))
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Deserialize)]
struct ArtistRecord {
    id: String,
    name: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    genres: Vec<String>,
}
impl ArtistRecord {
    fn to_domain(self) -> Artist {
        Artist {
            id: self.id,
            name: self.name,
            image_urls: self.images,
            genres: self.genres,
        }
    }
}

#[derive(Deserialize)]
struct TrackRecord {
    id: String,
    #[serde(default)]
    isrc: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    album_art: Option<String>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    popularity: u32,
}
impl TrackRecord {
    fn to_domain(self) -> Track {
        Track {
            // Tracks without an ISRC are recorded under their id.
            isrc: self.isrc.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            name: self.name,
            artists: self.artists,
            album_art_url: self.album_art,
            preview_url: self.preview_url,
            genres: self.genres,
            popularity: self.popularity,
        }
    }
}

#[derive(Serialize)]
struct DiscoveryPayload<'a> {
    artist_names: &'a [String],
    workout: &'a str,
}

#[derive(Serialize)]
struct SongActionPayload<'a> {
    isrc: &'a str,
    song_name: &'a str,
    artist: &'a str,
    genres: String,
    action: &'a str,
}

#[derive(Deserialize)]
struct StatusRecord {
    message: String,
}

#[derive(Serialize)]
struct PlaylistPayload<'a> {
    name: &'a str,
    track_ids: Vec<&'a str>,
}

#[derive(Deserialize)]
struct PlaylistRecord {
    playlist_url: String,
}

//=========================================================================================
// `DiscoveryBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl DiscoveryBackend for HttpBackendAdapter {
    async fn fetch_artists(
        &self,
        token: &AccessToken,
        workout: &str,
        mood: &str,
    ) -> PortResult<Vec<Artist>> {
        let request = self
            .client
            .get(self.url("/api/artists"))
            .query(&[("workout", workout), ("mood", mood)]);
        let records: Vec<ArtistRecord> = self.send_json(request, token).await?;
        Ok(records.into_iter().map(ArtistRecord::to_domain).collect())
    }

    async fn discover_tracks(
        &self,
        token: &AccessToken,
        request: &DiscoveryRequest,
    ) -> PortResult<Vec<Track>> {
        let payload = DiscoveryPayload {
            artist_names: &request.artist_names,
            workout: &request.workout,
        };
        let records: Vec<TrackRecord> = self
            .send_json(self.client.post(self.url("/api/discover")).json(&payload), token)
            .await?;
        Ok(records.into_iter().map(TrackRecord::to_domain).collect())
    }

    async fn record_action(&self, token: &AccessToken, action: &SongAction) -> PortResult<String> {
        let payload = SongActionPayload {
            isrc: &action.isrc,
            song_name: &action.song_name,
            artist: &action.artist,
            genres: action.joined_genres(),
            action: action.action.as_str(),
        };
        let status: StatusRecord = self
            .send_json(self.client.post(self.url("/api/track-action")).json(&payload), token)
            .await?;
        Ok(status.message)
    }

    async fn preview_playlist(
        &self,
        token: &AccessToken,
        request: &DiscoveryRequest,
    ) -> PortResult<Vec<Track>> {
        let payload = DiscoveryPayload {
            artist_names: &request.artist_names,
            workout: &request.workout,
        };
        let records: Vec<TrackRecord> = self
            .send_json(self.client.post(self.url("/api/playlist/preview")).json(&payload), token)
            .await?;
        Ok(records.into_iter().map(TrackRecord::to_domain).collect())
    }

    async fn create_playlist(
        &self,
        token: &AccessToken,
        draft: &PlaylistDraft,
    ) -> PortResult<CreatedPlaylist> {
        let payload = PlaylistPayload {
            name: &draft.name,
            track_ids: draft.tracks.iter().map(|t| t.id.as_str()).collect(),
        };
        let record: PlaylistRecord = self
            .send_json(self.client.post(self.url("/api/playlist")).json(&payload), token)
            .await?;
        Ok(CreatedPlaylist {
            url: record.playlist_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use discovery_core::domain::ActionKind;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn bearer_ok(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "Bearer secret")
            .unwrap_or(false)
    }

    async fn fake_backend() -> String {
        let app = Router::new()
            .route(
                "/api/artists",
                get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    if !bearer_ok(&headers) {
                        return Err(AxumStatus::UNAUTHORIZED);
                    }
                    if q.get("workout").map(String::as_str) == Some("broken") {
                        return Err(AxumStatus::BAD_GATEWAY);
                    }
                    Ok(Json(json!([
                        { "id": "1", "name": "Alpha", "images": ["http://img/1"], "genres": ["pop"] },
                        { "id": "2", "name": "Beta" }
                    ])))
                }),
            )
            .route(
                "/api/track-action",
                post(|Json(body): Json<Value>| async move {
                    let action = body["action"].as_str().unwrap_or("");
                    let genres = body["genres"].as_str().unwrap_or("");
                    Json(json!({ "message": format!("{} {}", action, genres) }))
                }),
            )
            .route(
                "/api/discover",
                post(|| async { "not json" }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn token(raw: &str) -> AccessToken {
        AccessToken::parse(Some(raw)).unwrap()
    }

    #[tokio::test]
    async fn fetch_artists_maps_records() {
        let adapter = HttpBackendAdapter::new(Client::new(), fake_backend().await);
        let artists = adapter
            .fetch_artists(&token("secret"), "cardio", "happy")
            .await
            .unwrap();

        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].image_urls, vec!["http://img/1".to_string()]);
        assert!(artists[1].genres.is_empty());
    }

    #[tokio::test]
    async fn status_codes_map_to_port_errors() {
        let adapter = HttpBackendAdapter::new(Client::new(), fake_backend().await);

        let unauthorized = adapter.fetch_artists(&token("wrong"), "cardio", "happy").await;
        assert!(matches!(unauthorized, Err(PortError::Unauthorized)));

        let upstream = adapter.fetch_artists(&token("secret"), "broken", "happy").await;
        assert!(matches!(upstream, Err(PortError::Http { status: 502, .. })));
    }

    #[tokio::test]
    async fn unparseable_body_is_unexpected() {
        let adapter = HttpBackendAdapter::new(Client::new(), fake_backend().await);
        let request = DiscoveryRequest {
            artist_names: vec!["Alpha".to_string()],
            workout: "cardio".to_string(),
        };
        let result = adapter.discover_tracks(&token("secret"), &request).await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }

    #[tokio::test]
    async fn record_action_sends_comma_joined_genres() {
        let adapter = HttpBackendAdapter::new(Client::new(), fake_backend().await);
        let action = SongAction {
            isrc: "X1".to_string(),
            song_name: "Song".to_string(),
            artist: "Alpha".to_string(),
            genres: vec!["pop".to_string(), "edm".to_string()],
            action: ActionKind::Dislike,
        };
        let message = adapter.record_action(&token("secret"), &action).await.unwrap();
        assert_eq!(message, "dislike pop,edm");
    }

    #[tokio::test]
    async fn connection_failure_is_unexpected() {
        let adapter = HttpBackendAdapter::new(Client::new(), "http://127.0.0.1:1".to_string());
        let result = adapter.fetch_artists(&token("secret"), "cardio", "happy").await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }
}
