use axum::{routing::{get, post}, Json, Router};
use serde_json::Value;

use crate::auth::AdminUser;
use crate::errors::ClubError;
use crate::services::pubsub_service::{self, SubscribeRequest, Subscription, UnsubscribeRequest};
use crate::state::AppState;

/// Webhook management under /pubsub. Admin only.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/pubsub", get(list_subscriptions))
        .route("/pubsub/subscribe", post(handle_subscribe))
        .route("/pubsub/unsubscribe", post(handle_unsubscribe))
        .with_state(state)
}

async fn list_subscriptions(_admin: AdminUser) -> Json<Vec<Subscription>> {
    Json(pubsub_service::list())
}

async fn handle_subscribe(
    _admin: AdminUser,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<Value>, ClubError> {
    pubsub_service::subscribe(req).map(Json)
}

async fn handle_unsubscribe(
    _admin: AdminUser,
    Json(req): Json<UnsubscribeRequest>,
) -> Json<Value> {
    Json(pubsub_service::unsubscribe(req.subscription_id))
}
