//! Trust-List HTTP server.
//!
//! Wires together the core library, storage backend, and HTTP routes into a
//! running Axum server. Serves the JSON API at `/api/*` and a liveness probe
//! at `/health`.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Maximum concurrent login attempts; each one runs a bcrypt check.
const LOGIN_CONCURRENCY: usize = 16;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let login_routes = routes::auth::router()
        .layer(tower::limit::ConcurrencyLimitLayer::new(LOGIN_CONCURRENCY));

    let api = Router::new()
        .merge(login_routes)
        .merge(routes::navbar::router(&state))
        .merge(routes::service::router(&state));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", api)
        .merge(routes::health::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
