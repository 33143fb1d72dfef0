//! services/api/src/adapters/auth.rs
//!
//! Adapter for the backend's OAuth token exchange. The backend holds the
//! music-service client secret; this side only forwards codes and refresh tokens.

use async_trait::async_trait;
use discovery_core::domain::TokenGrant;
use discovery_core::ports::{AuthService, PortError, PortResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::backend::{check_status, parse_json};

#[derive(Clone)]
pub struct HttpAuthAdapter {
    client: Client,
    base_url: String,
}

impl HttpAuthAdapter {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn post_for_grant<P: Serialize + Sync>(
        &self,
        path: &str,
        payload: &P,
    ) -> PortResult<TokenGrant> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Token request failed: {}", e)))?;
        let record: TokenRecord = parse_json(check_status(response).await?).await?;
        record.to_domain()
    }
}

#[derive(Serialize)]
struct ExchangePayload<'a> {
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct RefreshPayload<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenRecord {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}
impl TokenRecord {
    fn to_domain(self) -> PortResult<TokenGrant> {
        if self.access_token.trim().is_empty() {
            return Err(PortError::Unexpected(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }
        Ok(TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in_secs: self.expires_in,
        })
    }
}

#[async_trait]
impl AuthService for HttpAuthAdapter {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> PortResult<TokenGrant> {
        self.post_for_grant("/auth/token", &ExchangePayload { code, redirect_uri })
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> PortResult<TokenGrant> {
        self.post_for_grant("/auth/refresh", &RefreshPayload { refresh_token })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn fake_auth() -> String {
        let app = Router::new()
            .route(
                "/auth/token",
                post(|Json(body): Json<Value>| async move {
                    if body["code"] == "good" {
                        Ok(Json(json!({ "access_token": "abc", "refresh_token": "r1", "expires_in": 3600 })))
                    } else {
                        Err(StatusCode::BAD_REQUEST)
                    }
                }),
            )
            .route(
                "/auth/refresh",
                post(|| async { Json(json!({ "access_token": "" })) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn exchange_returns_grant() {
        let adapter = HttpAuthAdapter::new(Client::new(), fake_auth().await);
        let grant = adapter.exchange_code("good", "http://cb").await.unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.refresh_token.as_deref(), Some("r1"));
        assert_eq!(grant.expires_in_secs, Some(3600));

        let rejected = adapter.exchange_code("bad", "http://cb").await;
        assert!(matches!(rejected, Err(PortError::Http { status: 400, .. })));
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let adapter = HttpAuthAdapter::new(Client::new(), fake_auth().await);
        assert!(matches!(adapter.refresh("r1").await, Err(PortError::Unexpected(_))));
    }
}
