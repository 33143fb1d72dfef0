//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, TokenRequest},
    protocol::{ArtistDto, TrackDto},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use discovery_core::catalog::present_artists;
use discovery_core::domain::{AccessToken, DiscoveryRequest, Track};
use discovery_core::playlist::export_playlist;
use discovery_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        artists_handler,
        preload_handler,
        cache_status_handler,
        discover_handler,
        preview_playlist_handler,
        create_playlist_handler,
        crate::web::auth::token_handler,
        crate::web::auth::refresh_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            ArtistsResponse, ArtistDto, TrackDto, TracksResponse, SeedRequest,
            CreatePlaylistRequest, CreatePlaylistResponse, CacheStatusResponse,
            TokenRequest, AuthResponse
        )
    ),
    tags(
        (
            name = "Discovery Bridge API",
            description = "Endpoints a front end uses to drive music discovery."
        )
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArtistsQuery {
    /// Mood passed to the backend; defaults to the configured mood.
    pub mood: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ArtistsResponse {
    pub workout: String,
    pub artists: Vec<ArtistDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct SeedRequest {
    pub artist_names: Vec<String>,
    pub workout: String,
}

#[derive(Serialize, ToSchema)]
pub struct TracksResponse {
    pub tracks: Vec<TrackDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    pub name: String,
    pub tracks: Vec<TrackDto>,
}

#[derive(Serialize, ToSchema)]
pub struct CreatePlaylistResponse {
    pub playlist_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct CacheStatusResponse {
    pub valid: bool,
    pub entries: usize,
    pub ttl_secs: i64,
    pub preloading: bool,
}

/// Maps a port failure to an HTTP status and a human-readable message.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::Unauthorized | PortError::MissingToken => StatusCode::UNAUTHORIZED,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Http { .. } => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

impl From<SeedRequest> for DiscoveryRequest {
    fn from(seed: SeedRequest) -> Self {
        DiscoveryRequest {
            artist_names: seed.artist_names,
            workout: seed.workout,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Artists for a workout, served from the cache when fresh.
///
/// Every call returns an independently shuffled selection of the configured size.
#[utoipa::path(
    get,
    path = "/workouts/{workout}/artists",
    params(("workout" = String, Path, description = "Workout category."), ArtistsQuery),
    responses(
        (status = 200, description = "Artists for the workout", body = ArtistsResponse),
        (status = 401, description = "No access token"),
        (status = 404, description = "Not a configured workout"),
        (status = 502, description = "Backend failure; the client may retry")
    )
)]
pub async fn artists_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    Path(workout): Path<String>,
    Query(query): Query<ArtistsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let workout = workout.to_lowercase();
    // Only configured workouts become cache keys.
    if !app_state.config.workouts.contains(&workout) {
        warn!("Rejected artist request for unknown workout '{}'", workout);
        return Err((
            StatusCode::NOT_FOUND,
            format!("Unknown workout '{}'", workout),
        ));
    }
    let mood = query
        .mood
        .unwrap_or_else(|| app_state.config.default_mood.clone());

    let artists = app_state
        .catalog
        .artists_for(&token, &workout, &mood)
        .await
        .map_err(|e| {
            error!("Failed to load artists for {}: {:?}", workout, e);
            port_error_response(e)
        })?;

    let shown = present_artists(&artists, app_state.config.artist_display_count);
    Ok(Json(ArtistsResponse {
        workout,
        artists: shown.into_iter().map(ArtistDto::from).collect(),
    }))
}

/// Starts a background preload of every configured workout.
#[utoipa::path(
    post,
    path = "/workouts/preload",
    responses(
        (status = 202, description = "Preload started, or one is already running"),
        (status = 401, description = "No access token")
    )
)]
pub async fn preload_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
) -> impl IntoResponse {
    let Some(guard) = app_state.begin_preload() else {
        info!("Artist preload already running; not starting another");
        return StatusCode::ACCEPTED;
    };
    let cancel = app_state.preload_token();
    let state = app_state.clone();
    tokio::spawn(async move {
        let _guard = guard;
        let report = state
            .catalog
            .preload(
                &token,
                &state.config.workouts,
                &state.config.default_mood,
                state.config.preload_delay,
                &cancel,
            )
            .await;
        for (workout, e) in &report.failed {
            warn!("Preload for {} failed: {}", workout, e);
        }
    });
    info!("Artist preload scheduled for {} workouts", app_state.config.workouts.len());
    StatusCode::ACCEPTED
}

/// Reports whether the artist cache is inside its freshness window.
#[utoipa::path(
    get,
    path = "/cache/status",
    responses((status = 200, description = "Cache diagnostics", body = CacheStatusResponse))
)]
pub async fn cache_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<CacheStatusResponse> {
    let cache = app_state.catalog.cache();
    Json(CacheStatusResponse {
        valid: cache.is_valid(),
        entries: cache.len(),
        ttl_secs: cache.ttl().num_seconds(),
        preloading: app_state.preload_in_progress(),
    })
}

/// Fetches discovery tracks for the selected seed artists.
#[utoipa::path(
    post,
    path = "/discover",
    request_body = SeedRequest,
    responses(
        (status = 200, description = "Tracks to swipe through", body = TracksResponse),
        (status = 401, description = "No access token"),
        (status = 502, description = "Backend failure")
    )
)]
pub async fn discover_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    Json(seed): Json<SeedRequest>,
) -> Result<Json<TracksResponse>, (StatusCode, String)> {
    let request = DiscoveryRequest::from(seed);
    let tracks = app_state
        .backend
        .discover_tracks(&token, &request)
        .await
        .map_err(port_error_response)?;
    Ok(Json(TracksResponse {
        tracks: tracks.into_iter().map(TrackDto::from).collect(),
    }))
}

/// Previews the playlist the backend would build for the seeds.
#[utoipa::path(
    post,
    path = "/playlists/preview",
    request_body = SeedRequest,
    responses(
        (status = 200, description = "Preview tracks", body = TracksResponse),
        (status = 401, description = "No access token"),
        (status = 502, description = "Backend failure")
    )
)]
pub async fn preview_playlist_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    Json(seed): Json<SeedRequest>,
) -> Result<Json<TracksResponse>, (StatusCode, String)> {
    let request = DiscoveryRequest::from(seed);
    let tracks = app_state
        .backend
        .preview_playlist(&token, &request)
        .await
        .map_err(port_error_response)?;
    Ok(Json(TracksResponse {
        tracks: tracks.into_iter().map(TrackDto::from).collect(),
    }))
}

/// Exports liked tracks as an upstream playlist.
#[utoipa::path(
    post,
    path = "/playlists",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = CreatePlaylistResponse),
        (status = 400, description = "No tracks to export"),
        (status = 401, description = "No access token"),
        (status = 502, description = "Backend failure")
    )
)]
pub async fn create_playlist_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(token): Extension<AccessToken>,
    Json(body): Json<CreatePlaylistRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if body.tracks.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one liked track is required".to_string(),
        ));
    }
    let liked: Vec<Track> = body.tracks.into_iter().map(Track::from).collect();
    let created = export_playlist(app_state.backend.as_ref(), &token, &body.name, &liked)
        .await
        .map_err(|e| {
            error!("Failed to create playlist: {:?}", e);
            port_error_response(e)
        })?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePlaylistResponse {
            playlist_url: created.url,
        }),
    ))
}
