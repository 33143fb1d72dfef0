//! services/api/src/web/middleware.rs
//!
//! Bearer-token middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use discovery_core::domain::AccessToken;
use std::sync::Arc;
use tracing::{debug, error};

use crate::web::state::AppState;

/// Middleware that resolves the upstream access token for the request.
///
/// Uses the `Authorization: Bearer` header when present, otherwise the stored
/// token. With neither, returns 401 without contacting the backend.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = match bearer_token(req.headers()) {
        Some(token) => token,
        None => state
            .stored_token()
            .await
            .map_err(|e| {
                error!("Failed to read stored token: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or_else(|| {
                debug!("Rejecting request without an access token");
                StatusCode::UNAUTHORIZED
            })?,
    };

    req.extensions_mut().insert(token);
    Ok(next.run(req).await)
}

/// Extracts a non-blank bearer token from the headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<AccessToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let raw = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    AccessToken::parse(Some(raw)).ok()
}
