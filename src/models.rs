//! Records held by the club store.
//!
//! Everything here round-trips through the JSON snapshot, so field names
//! are part of the on-disk format as well as the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type ComponentId = String;

/// Generate a fresh record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

/// Public profile of a club member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(rename = "class", default)]
    pub class_name: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name shown in logs and member lists.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

/// Salted SHA-256 credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHash {
    pub salt: String,
    pub hash: String,
}

/// A user together with the credential used at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub password: PasswordHash,
    pub created_at: DateTime<Utc>,
}

/// Live bearer-token session. Keyed by the SHA-256 of the token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The single physical lab key.
///
/// `current_holder_id` and `taken_at` are set exactly when `is_in_use` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub is_in_use: bool,
    pub current_holder_id: Option<UserId>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl KeyState {
    pub fn is_held_by(&self, user_id: &str) -> bool {
        self.is_in_use && self.current_holder_id.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: u32,
    pub in_use: u32,
    pub created_at: DateTime<Utc>,
}

impl Component {
    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.in_use)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Taken,
    Returned,
}

/// What a usage log entry refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoggedResource {
    LabKey,
    Component { id: ComponentId, name: String },
}

/// One append-only take/return event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: String,
    pub user_id: UserId,
    /// Display name at the time of the event.
    pub user: String,
    pub resource: LoggedResource,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub is_present: bool,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub id: String,
    pub user_id: UserId,
    pub user: String,
    pub is_present: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: String,
    pub date: DateTime<Utc>,
    pub task: String,
    pub assigned_to: Vec<UserId>,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
