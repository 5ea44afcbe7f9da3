use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AdminUser;
use crate::models::UsageLogEntry;
use crate::services::usage_service;
use crate::state::AppState;

/// Combined key and component trail for admins.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/usage", get(full_log))
        .with_state(state)
}

/// GET /usage, newest first
async fn full_log(State(state): State<AppState>, _admin: AdminUser) -> Json<Vec<UsageLogEntry>> {
    Json(usage_service::full_log(&state.store))
}
