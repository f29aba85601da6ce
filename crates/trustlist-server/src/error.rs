//! HTTP error types for the Trust-List server.
//!
//! Maps domain errors from `trustlist-core` into HTTP responses. Every
//! error variant produces a JSON body with a machine-readable `error` field
//! and a human-readable `message`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use trustlist_core::error::{AccessError, AuthError, StoreError, ValidationError};

/// Message for every login failure.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
/// Message for every token failure at the admin gate.
pub const UNAUTHORIZED: &str = "unauthorized";

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Login failed or the token is unusable.
    Unauthorized(String),
    /// Valid token without the admin role.
    Forbidden(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// The client edited a stale document.
    Conflict(String),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(INVALID_CREDENTIALS.to_owned()),
            AuthError::Malformed | AuthError::Expired | AuthError::BadSignature => {
                Self::Unauthorized(UNAUTHORIZED.to_owned())
            }
            AuthError::Primitive { .. } | AuthError::Backend { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthorized(UNAUTHORIZED.to_owned()),
            AccessError::NotAdmin => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            StoreError::Serialization { .. } | StoreError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::Expired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AccessError::NotAdmin), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(StoreError::NotFound {
                kind: "navbar item",
                id: Uuid::nil()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::Conflict {
                expected: 1,
                actual: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ValidationError::NoValidDetail), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AuthError::Backend {
                reason: "down".to_owned()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_failures_share_one_message() {
        for err in [AuthError::Malformed, AuthError::Expired, AuthError::BadSignature] {
            assert!(matches!(
                AppError::from(err),
                AppError::Unauthorized(msg) if msg == UNAUTHORIZED
            ));
        }
    }
}
