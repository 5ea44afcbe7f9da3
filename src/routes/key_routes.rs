use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ClubError;
use crate::models::UsageLogEntry;
use crate::services::key_service::{self, KeyView};
use crate::services::pubsub_service::{self, Topic};
use crate::services::usage_service;
use crate::state::AppState;

/// Build all lab key routes under /keys
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/keys/state", get(key_state))
        .route("/keys/toggle", post(toggle_key))
        .route("/keys/history", get(key_history))
        .with_state(state)
}

//
// ─────────────────────────────────────────────────────────────
// GET /keys/state
// ─────────────────────────────────────────────────────────────
//
async fn key_state(State(state): State<AppState>, auth: AuthUser) -> Json<KeyView> {
    Json(key_service::state(&state.store, &auth.user))
}

//
// ─────────────────────────────────────────────────────────────
// POST /keys/toggle
// Take a free key or return your own; 409 if someone else has it
// ─────────────────────────────────────────────────────────────
//
async fn toggle_key(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<KeyView>, ClubError> {
    let key = key_service::toggle(&state.store, &auth.user)?;
    let view = KeyView::after_toggle(key, &auth.user);

    pubsub_service::publish(
        Topic::Keys,
        if view.is_in_use { "taken" } else { "returned" },
        json!({
            "user_id": auth.user.id,
            "user": auth.user.display_name(),
            "taken_at": view.taken_at,
        }),
    );
    Ok(Json(view))
}

//
// ─────────────────────────────────────────────────────────────
// GET /keys/history
// Admin audit trail, newest first
// ─────────────────────────────────────────────────────────────
//
async fn key_history(State(state): State<AppState>, _admin: AdminUser) -> Json<Vec<UsageLogEntry>> {
    Json(usage_service::key_log(&state.store))
}
