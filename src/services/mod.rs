pub mod auth_service;
pub mod component_service;
pub mod key_service;
pub mod presence_service;
pub mod pubsub_service;
pub mod schedule_service;
pub mod usage_service;
pub mod user_service;
