use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::errors::ClubError;
use crate::models::{
    Account, Component, ComponentId, KeyState, Presence, PresenceEvent, ScheduleItem, Session,
    UsageLogEntry, User, UserId,
};

/// Units of each component a user currently holds.
pub type Holdings = BTreeMap<UserId, BTreeMap<ComponentId, u32>>;

/// Everything the service knows, guarded by a single lock.
///
/// Logs are kept in creation order; readers reverse them for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClubData {
    pub accounts: HashMap<UserId, Account>,
    pub key: KeyState,
    pub components: HashMap<ComponentId, Component>,
    pub holdings: Holdings,
    pub usage_log: Vec<UsageLogEntry>,
    pub presence: HashMap<UserId, Presence>,
    pub presence_log: Vec<PresenceEvent>,
    pub schedule: Vec<ScheduleItem>,

    /// Token hash -> session. Not written to snapshots.
    #[serde(skip)]
    pub sessions: HashMap<String, Session>,
}

impl ClubData {
    pub fn user(&self, id: &str) -> Result<&User, ClubError> {
        self.accounts
            .get(id)
            .map(|a| &a.user)
            .ok_or(ClubError::NotFound("User"))
    }

    pub fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.user.username.eq_ignore_ascii_case(username))
    }

    /// How many units of `component_id` the user holds right now.
    pub fn held(&self, user_id: &str, component_id: &str) -> u32 {
        self.holdings
            .get(user_id)
            .and_then(|m| m.get(component_id))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every user's holding for one component.
    pub fn held_total(&self, component_id: &str) -> u32 {
        self.holdings
            .values()
            .filter_map(|m| m.get(component_id))
            .sum()
    }
}

/// Shared store type used across the app.
pub type ClubStore = Arc<RwLock<ClubData>>;

/// Create a new, empty store.
pub fn new_store() -> ClubStore {
    Arc::new(RwLock::new(ClubData::default()))
}

/// Lock for reading.
///
/// Services validate before they mutate, so a panic while the lock was
/// held cannot leave half-applied state behind; the poison flag is ignored.
pub fn read(store: &ClubStore) -> RwLockReadGuard<'_, ClubData> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

/// Lock for a read-modify-write. One guard covers the whole mutation.
pub fn write(store: &ClubStore) -> RwLockWriteGuard<'_, ClubData> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}
