use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ClubError;
use crate::models::ScheduleItem;
use crate::services::pubsub_service::{self, Topic};
use crate::services::schedule_service::{self, NewSchedule};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub mine: bool,
}

/// Build all schedule routes under /schedule
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/schedule", get(list_schedule).post(create_schedule))
        .route("/schedule/", get(list_schedule).post(create_schedule))
        .route("/schedule/:id", delete(delete_schedule))
        .route("/schedule/:id/complete", post(complete_schedule))
        .with_state(state)
}

async fn list_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ScheduleItem>> {
    Json(schedule_service::list(&state.store, &auth.user, query.mine))
}

async fn create_schedule(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<NewSchedule>,
) -> Result<(StatusCode, Json<ScheduleItem>), ClubError> {
    let item = schedule_service::create(&state.store, req)?;

    // Assigned members learn about new work through the schedule hook.
    pubsub_service::publish(
        Topic::Schedule,
        "created",
        json!({
            "id": item.id,
            "task": item.task,
            "date": item.date,
            "assigned_to": item.assigned_to,
        }),
    );
    Ok((StatusCode::CREATED, Json(item)))
}

async fn complete_schedule(
    Path(id): Path<String>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ScheduleItem>, ClubError> {
    let item = schedule_service::complete(&state.store, &id, &auth.user)?;

    pubsub_service::publish(
        Topic::Schedule,
        "completed",
        json!({ "id": item.id, "task": item.task, "completed_by": auth.user.id }),
    );
    Ok(Json(item))
}

async fn delete_schedule(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ScheduleItem>, ClubError> {
    schedule_service::delete(&state.store, &id).map(Json)
}
