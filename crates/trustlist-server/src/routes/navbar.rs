//! Navbar routes: `/api/navbar`, `/api/navbar/seed`
//!
//! Listing is public. Updating an item and reseeding the default set go
//! through the admin gate.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware as axum_mw;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trustlist_core::model::{NavbarItem, NavbarPatch};

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::middleware::require_admin;
use crate::state::AppState;

/// Build the navbar router.
pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route("/navbar", put(update_item))
        .route("/navbar/seed", get(seed))
        .route_layer(axum_mw::from_fn_with_state(Arc::clone(state), require_admin));

    Router::new().route("/navbar", get(list)).merge(admin)
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NavbarListResponse {
    pub items: Vec<NavbarItem>,
}

/// Body of `PUT /api/navbar`. Absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateNavbarRequest {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub patch: NavbarPatch,
}

#[derive(Debug, Serialize)]
pub struct UpdateNavbarResponse {
    pub message: &'static str,
    pub item: NavbarItem,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<NavbarListResponse>, AppError> {
    let items = state.store.navbar_items().await?;
    Ok(Json(NavbarListResponse { items }))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<UpdateNavbarRequest>,
) -> Result<Json<UpdateNavbarResponse>, AppError> {
    let raw_id = body
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("ID is required".to_owned()))?;
    let id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| AppError::BadRequest(format!("invalid navbar item id '{raw_id}'")))?;

    let item = state.store.update_navbar_item(id, body.patch).await?;
    Ok(Json(UpdateNavbarResponse {
        message: "Navbar item updated",
        item,
    }))
}

/// Replace the navbar with the default item set.
async fn seed(State(state): State<Arc<AppState>>) -> Result<Json<SeedResponse>, AppError> {
    state.store.reseed_navbar().await?;
    Ok(Json(SeedResponse { success: true }))
}
