pub mod auth_routes;
pub mod component_routes;
pub mod key_routes;
pub mod presence_routes;
pub mod pubsub_routes;
pub mod schedule_routes;
pub mod system_routes;
pub mod usage_routes;
pub mod user_routes;
