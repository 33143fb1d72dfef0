//! services/api/src/web/routes.rs
//!
//! Assembles the bridge router from the handlers.

use crate::web::{
    auth::{logout_handler, refresh_handler, token_handler},
    middleware::require_token,
    rest::{
        artists_handler, cache_status_handler, create_playlist_handler, discover_handler,
        preload_handler, preview_playlist_handler,
    },
    state::AppState,
    ws_handler::ws_handler,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Builds the API routes. CORS and documentation layers are added by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no token required)
    let public_routes = Router::new()
        .route("/auth/token", post(token_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/cache/status", get(cache_status_handler));

    // Protected routes (token required, checked locally before any backend call)
    let protected_routes = Router::new()
        .route("/workouts/{workout}/artists", get(artists_handler))
        .route("/workouts/preload", post(preload_handler))
        .route("/discover", post(discover_handler))
        .route("/playlists/preview", post(preview_playlist_handler))
        .route("/playlists", post(create_playlist_handler))
        .route("/ws/discovery", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_token,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
