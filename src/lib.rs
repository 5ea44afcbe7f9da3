//! clubdesk: REST backend for a club lab portal.
//!
//! Tracks the single lab key, component stock checked out by members,
//! who is in the lab and the task schedule, behind bearer-token auth.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod routes;
pub mod services;
pub mod state;

pub use app::build_app;
pub use client::{ClientError, ClubClient};
pub use config::AppConfig;
pub use errors::ClubError;
pub use state::{new_store, AppState, ClubStore};
