//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON request body. Rejections become [`AppError::BadRequest`], so a
/// malformed body gets the same `{error, message}` shape as every other
/// failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
