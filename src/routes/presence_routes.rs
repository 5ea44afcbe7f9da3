use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::auth::{AdminUser, AuthUser};
use crate::models::{Presence, PresenceEvent};
use crate::services::presence_service::{self, PresentMember};
use crate::services::pubsub_service::{self, Topic};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/presence/me", get(my_presence))
        .route("/presence/toggle", post(toggle_presence))
        .route("/presence/members", get(present_members))
        .route("/presence/history", get(presence_history))
        .with_state(state)
}

async fn my_presence(State(state): State<AppState>, auth: AuthUser) -> Json<Presence> {
    Json(presence_service::me(&state.store, &auth.user))
}

async fn toggle_presence(State(state): State<AppState>, auth: AuthUser) -> Json<Presence> {
    let presence = presence_service::toggle(&state.store, &auth.user);

    pubsub_service::publish(
        Topic::Presence,
        if presence.is_present { "arrived" } else { "left" },
        json!({ "user_id": auth.user.id, "user": auth.user.display_name() }),
    );
    Json(presence)
}

async fn present_members(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<Vec<PresentMember>> {
    Json(presence_service::present_members(&state.store))
}

async fn presence_history(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Json<Vec<PresenceEvent>> {
    Json(presence_service::history(&state.store))
}
