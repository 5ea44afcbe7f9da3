use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ClubError;
use crate::models::{Component, UsageLogEntry};
use crate::services::component_service::{
    self, ComponentView, Holding, NewComponent, Returned,
};
use crate::services::pubsub_service::{self, Topic};
use crate::services::usage_service;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UseRequest {
    pub quantity: u32,
}

/// Build all component routes under /components
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/components", get(list_components).post(create_component))
        .route("/components/", get(list_components).post(create_component))
        .route("/components/mine", get(my_holdings))
        .route("/components/usage", get(usage_log))
        .route("/components/:id", delete(delete_component))
        .route("/components/:id/use", post(use_component))
        .route("/components/:id/return", post(return_component))
        .with_state(state)
}

//
// ─────────────────────────────────────────────────────────────
// GET /components
// Every component with `available` and the caller's `held_by_me`
// ─────────────────────────────────────────────────────────────
//
async fn list_components(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<Vec<ComponentView>> {
    Json(component_service::list(&state.store, &auth.user))
}

//
// ─────────────────────────────────────────────────────────────
// POST /components
// Admin adds a new stock line
// ─────────────────────────────────────────────────────────────
//
async fn create_component(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<NewComponent>,
) -> Result<(StatusCode, Json<Component>), ClubError> {
    let component = component_service::create(&state.store, req)?;
    Ok((StatusCode::CREATED, Json(component)))
}

//
// ─────────────────────────────────────────────────────────────
// DELETE /components/{id}
// Only while no unit is checked out
// ─────────────────────────────────────────────────────────────
//
async fn delete_component(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Component>, ClubError> {
    component_service::delete(&state.store, &id).map(Json)
}

//
// ─────────────────────────────────────────────────────────────
// POST /components/{id}/use
// Check out units; 409 when the request exceeds what is available
// ─────────────────────────────────────────────────────────────
//
async fn use_component(
    Path(id): Path<String>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UseRequest>,
) -> Result<Json<ComponentView>, ClubError> {
    let view = component_service::use_units(&state.store, &id, req.quantity, &auth.user)?;

    pubsub_service::publish(
        Topic::Components,
        "taken",
        json!({
            "component_id": view.component.id,
            "user_id": auth.user.id,
            "quantity": req.quantity,
            "available": view.available,
        }),
    );
    Ok(Json(view))
}

//
// ─────────────────────────────────────────────────────────────
// POST /components/{id}/return
// Hand back everything the caller holds of this component
// ─────────────────────────────────────────────────────────────
//
async fn return_component(
    Path(id): Path<String>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Returned>, ClubError> {
    let returned = component_service::return_units(&state.store, &id, &auth.user)?;

    pubsub_service::publish(
        Topic::Components,
        "returned",
        json!({
            "component_id": returned.component.component.id,
            "user_id": auth.user.id,
            "quantity": returned.returned,
            "available": returned.component.available,
        }),
    );
    Ok(Json(returned))
}

//
// ─────────────────────────────────────────────────────────────
// GET /components/mine
// ─────────────────────────────────────────────────────────────
//
async fn my_holdings(State(state): State<AppState>, auth: AuthUser) -> Json<Vec<Holding>> {
    Json(component_service::holdings_of(&state.store, &auth.user))
}

//
// ─────────────────────────────────────────────────────────────
// GET /components/usage
// Admin audit trail, newest first
// ─────────────────────────────────────────────────────────────
//
async fn usage_log(State(state): State<AppState>, _admin: AdminUser) -> Json<Vec<UsageLogEntry>> {
    Json(usage_service::component_log(&state.store))
}
