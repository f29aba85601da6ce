//! Service document routes: `/api/service`, `/api/service/edit`
//!
//! `POST /api/service` replaces the whole document. `POST /api/service/edit`
//! applies one tree-editor command to the stored document on the server.
//! Both accept an optional base `version`; a stale version is rejected with
//! 409 and nothing is written.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use trustlist_core::editor::{self, EditCommand};
use trustlist_core::error::StoreError;
use trustlist_core::model::{Card, Promo, ServiceDocument};
use trustlist_core::token::Claims;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::require_admin;
use crate::state::AppState;

/// Build the service router.
pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route("/service", post(put_service))
        .route("/service/edit", post(edit_service))
        .route_layer(axum_mw::from_fn_with_state(Arc::clone(state), require_admin));

    Router::new().route("/service", get(get_service)).merge(admin)
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub service: Option<ServiceDocument>,
}

/// Body of `POST /api/service`: the full document plus an optional base version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutServiceRequest {
    #[serde(default)]
    pub image_link: String,
    #[serde(rename = "para", default)]
    pub promo: Promo,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub version: Option<u64>,
}

impl PutServiceRequest {
    fn into_parts(self) -> (ServiceDocument, Option<u64>) {
        let document = ServiceDocument {
            image_link: self.image_link,
            promo: self.promo,
            cards: self.cards,
            ..ServiceDocument::default()
        };
        (document, self.version)
    }
}

#[derive(Debug, Deserialize)]
pub struct EditServiceRequest {
    pub command: EditCommand,
    #[serde(default)]
    pub version: Option<u64>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn get_service(State(state): State<Arc<AppState>>) -> Result<Json<ServiceResponse>, AppError> {
    let service = state.store.service().await?;
    Ok(Json(ServiceResponse { service }))
}

/// Create or fully replace the service document.
async fn put_service(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    JsonBody(body): JsonBody<PutServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let (document, base_version) = body.into_parts();
    let saved = state.store.put_service(document, base_version).await?;
    info!(sub = %claims.sub, version = saved.version, "service document saved");
    Ok(Json(ServiceResponse {
        service: Some(saved),
    }))
}

/// Apply one structural edit to the stored document.
///
/// Positional indices are resolved against the document as stored now. If
/// the caller sent a version and it is stale, the edit is refused before
/// the indices are looked at.
async fn edit_service(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    JsonBody(body): JsonBody<EditServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let current = state.store.service().await?.unwrap_or_default();

    if let Some(expected) = body.version {
        if expected != current.version {
            return Err(StoreError::Conflict {
                expected,
                actual: current.version,
            }
            .into());
        }
    }

    let read_version = current.version;
    let next = editor::apply(current, body.command)?;
    let saved = state.store.put_service(next, Some(read_version)).await?;
    info!(sub = %claims.sub, version = saved.version, "service document edited");
    Ok(Json(ServiceResponse {
        service: Some(saved),
    }))
}
