use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ClubError;
use crate::models::User;
use crate::services::user_service::{self, NewUser, ProfileUpdate};
use crate::state::AppState;

/// Build all user routes under /users
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/users/me", get(me).put(update_me))
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
        .with_state(state)
}

async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ClubError> {
    user_service::update_profile(&state.store, &auth.user.id, update).map(Json)
}

async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> Json<Vec<User>> {
    Json(user_service::list(&state.store))
}

async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ClubError> {
    let user = user_service::create(&state.store, req)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<User>, ClubError> {
    user_service::delete(&state.store, &admin.id, &id).map(Json)
}
