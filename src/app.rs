use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::AppConfig;
use crate::routes::{
    auth_routes, component_routes, key_routes, presence_routes, pubsub_routes, schedule_routes,
    system_routes, usage_routes, user_routes,
};
use crate::state::AppState;

/// Build the complete Axum application:
/// - /auth        (login / logout)
/// - /users       (profile + admin user management)
/// - /components  (stock ledger and usage log)
/// - /keys        (lab key register)
/// - /usage       (combined audit trail)
/// - /presence    (who is in the lab)
/// - /schedule    (assigned tasks)
/// - /pubsub      (webhook subscriptions)
/// - /system      (alive + version)
pub fn build_app(state: AppState, cfg: AppConfig) -> Router {
    Router::new()
        .merge(auth_routes::routes(state.clone()))
        .merge(user_routes::routes(state.clone()))
        .merge(component_routes::routes(state.clone()))
        .merge(key_routes::routes(state.clone()))
        .merge(usage_routes::routes(state.clone()))
        .merge(presence_routes::routes(state.clone()))
        .merge(schedule_routes::routes(state.clone()))
        .merge(pubsub_routes::routes(state))
        .merge(system_routes::routes(cfg))
        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
