//! services/api/src/web/auth.rs
//!
//! Endpoints for the upstream OAuth token exchange, refresh and logout.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use discovery_core::domain::TokenGrant;
use discovery_core::ports::{PortError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::{rest::port_error_response, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct TokenRequest {
    pub code: String,
    /// Defaults to the configured redirect URI.
    pub redirect_uri: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in_secs: Option<u64>,
    pub has_refresh_token: bool,
}

async fn persist_grant(state: &AppState, grant: &TokenGrant) -> Result<(), (StatusCode, String)> {
    state
        .tokens
        .set(ACCESS_TOKEN_KEY, &grant.access_token)
        .await
        .map_err(|e| {
            error!("Failed to store access token: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store token".to_string())
        })?;
    if let Some(refresh_token) = &grant.refresh_token {
        state
            .tokens
            .set(REFRESH_TOKEN_KEY, refresh_token)
            .await
            .map_err(|e| {
                error!("Failed to store refresh token: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store token".to_string())
            })?;
    }
    Ok(())
}

fn to_response(grant: TokenGrant) -> AuthResponse {
    AuthResponse {
        has_refresh_token: grant.refresh_token.is_some(),
        access_token: grant.access_token,
        expires_in_secs: grant.expires_in_secs,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/token - Exchange an authorization code for tokens
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Tokens issued and stored", body = AuthResponse),
        (status = 400, description = "Blank authorization code"),
        (status = 502, description = "Token exchange failed")
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.code.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Authorization code is required".to_string()));
    }
    let redirect_uri = req
        .redirect_uri
        .unwrap_or_else(|| state.config.oauth_redirect_uri.clone());

    let grant = state
        .auth
        .exchange_code(req.code.trim(), &redirect_uri)
        .await
        .map_err(|e| {
            error!("Token exchange failed: {:?}", e);
            port_error_response(e)
        })?;
    persist_grant(&state, &grant).await?;
    info!("Upstream token exchanged and stored");

    Ok(Json(to_response(grant)))
}

/// POST /auth/refresh - Refresh the stored access token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = AuthResponse),
        (status = 401, description = "No refresh token stored"),
        (status = 502, description = "Refresh failed")
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let refresh_token = state
        .tokens
        .get(REFRESH_TOKEN_KEY)
        .await
        .map_err(port_error_response)?
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| port_error_response(PortError::MissingToken))?;

    let mut grant = state.auth.refresh(&refresh_token).await.map_err(|e| {
        error!("Token refresh failed: {:?}", e);
        port_error_response(e)
    })?;
    // Providers may omit the refresh token on refresh; the old one stays valid.
    if grant.refresh_token.is_none() {
        grant.refresh_token = Some(refresh_token);
    }
    persist_grant(&state, &grant).await?;
    info!("Upstream token refreshed");

    Ok(Json(to_response(grant)))
}

/// POST /auth/logout - Forget tokens and cached artists
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logout successful"),
        (status = 500, description = "Failed to clear stored tokens")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.sign_out().await.map_err(|e| {
        error!("Failed to logout: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
    })?;
    info!("Signed out; artist cache cleared");
    Ok(StatusCode::NO_CONTENT)
}
