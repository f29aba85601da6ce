//! Authentication routes: `/api/login`, `/api/session`
//!
//! Login exchanges an email/password pair for a signed token. Session
//! reports the role the server derives from the caller's token, so clients
//! never decode tokens themselves.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use trustlist_core::error::AuthError;
use trustlist_core::token::Role;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::request_token;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(session))
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub role: Role,
    pub is_admin: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Verify credentials and issue a token.
async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .credentials
        .authenticate(&body.email, &body.password)
        .await
        .inspect_err(|e| {
            if *e == AuthError::InvalidCredentials {
                info!("login rejected");
            }
        })?;

    let token = state.tokens.issue_default(&user.subject())?;
    info!(user_id = %user.id, role = %user.role, "login succeeded");

    Ok(Json(LoginResponse { token }))
}

/// Report the role derived from the caller's token.
async fn session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<SessionResponse> {
    let role = state.gate.derive_role(request_token(&headers));
    Json(SessionResponse {
        role,
        is_admin: role.is_admin(),
    })
}
