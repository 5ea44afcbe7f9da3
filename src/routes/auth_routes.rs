use axum::{
    extract::State,
    routing::post,
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::errors::ClubError;
use crate::services::auth_service;
use crate::state::AppState;

/// Form body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .with_state(state)
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ClubError> {
    let access_token = auth_service::login(
        &state.store,
        &form.username,
        &form.password,
        state.token_ttl_seconds,
        Utc::now(),
    )?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

async fn logout(State(state): State<AppState>, auth: AuthUser) -> Json<Value> {
    let revoked = auth_service::logout(&state.store, &auth.token);
    Json(json!({ "logged_out": revoked }))
}
