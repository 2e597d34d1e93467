//! Request handlers.

use super::AppState;
use crate::error::ServiceError;
use crate::jwks::{Jwks, JwksAssembler};
use crate::jwt::ANONYMOUS_SUBJECT;
use crate::keys::unix_now;
use crate::metrics;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rust_common::RateLimitDecision;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

/// Body of `POST /register`. Both fields are required, but absence is
/// reported with a fixed message rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Requested login name
    pub username: Option<String>,
    /// Contact address
    pub email: Option<String>,
}

/// Body of a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Generated password
    pub password: String,
}

/// Optional credentials on `POST /auth`.
#[derive(Deserialize)]
pub struct AuthRequest {
    /// Registered login name
    pub username: String,
    /// Password issued at registration
    pub password: String,
}

/// Query string of `POST /auth`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    /// `true` requests a token signed by an expired key
    pub expired: Option<String>,
}

impl AuthQuery {
    fn want_expired(&self) -> bool {
        self.expired.as_deref() == Some("true")
    }
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterResponse>), ServiceError> {
    let request: RegisterRequest = serde_json::from_slice(&body).unwrap_or_default();

    let registration = state
        .registrar
        .register(request.username.as_deref(), request.email.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            password: registration.password.as_str().to_owned(),
        }),
    ))
}

/// `POST /auth`
///
/// Rate-limited per client address. A credential body attributes the
/// attempt to a registered user; without one the token is anonymous.
pub async fn auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    body: Bytes,
) -> Result<String, ServiceError> {
    let request_ip = addr.ip().to_string();

    if let RateLimitDecision::Denied { retry_after } = state.rate_limiter.check(&request_ip).await {
        metrics::record_rate_limited();
        return Err(ServiceError::RateLimited { retry_after });
    }

    let mut subject = ANONYMOUS_SUBJECT.to_string();
    let mut user_id = None;

    if let Ok(credentials) = serde_json::from_slice::<AuthRequest>(&body) {
        match state
            .registrar
            .verify_credentials(&credentials.username, &credentials.password)
            .await
        {
            Ok(Some(id)) => {
                subject = credentials.username;
                user_id = Some(id);
            }
            Ok(None) => {}
            Err(e) => {
                state.auth_log.record(request_ip, None);
                return Err(e);
            }
        }
    }

    let issued = state
        .issuer
        .issue(query.want_expired(), &subject, unix_now())
        .await?;

    state.auth_log.record(request_ip, user_id);
    info!(client = %addr.ip(), kid = %issued.kid, ?user_id, "Token issued");

    Ok(issued.token)
}

/// `GET /.well-known/jwks.json`
pub async fn jwks(State(state): State<AppState>) -> Result<Json<Jwks>, ServiceError> {
    let keys = state.key_manager.fetch_all_fresh_keys(unix_now()).await?;
    metrics::record_jwks_served();
    Ok(Json(JwksAssembler::render(&keys)))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /metrics`
pub async fn export_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}

/// Fallback for unsupported methods on known paths.
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
