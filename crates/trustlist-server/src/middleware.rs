//! Admin gate middleware.
//!
//! Reads the `Authorization: Bearer` header, runs it through the
//! [`AuthGate`](trustlist_core::gate::AuthGate), and injects the verified
//! [`Claims`](trustlist_core::token::Claims) into the request extensions.
//! Requests without an admin token never reach the handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use trustlist_core::gate::bearer_token;

use crate::error::AppError;
use crate::state::AppState;

/// The bearer token in `headers`, if any.
pub fn request_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

/// Middleware that admits only admin callers.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = match state.gate.require_admin(request_token(req.headers())) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), reason = %e, "admin route refused");
            return AppError::from(e).into_response();
        }
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}
