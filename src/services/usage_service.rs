use chrono::{DateTime, Utc};

use crate::models::{new_id, Action, LoggedResource, UsageLogEntry, User};
use crate::state::club::{self, ClubData, ClubStore};

/// Append one event. Called with the write guard of the mutation it records,
/// so an entry exists exactly when the mutation was applied.
pub(crate) fn record(
    data: &mut ClubData,
    user: &User,
    resource: LoggedResource,
    quantity: u32,
    action: Action,
    at: DateTime<Utc>,
) -> UsageLogEntry {
    let entry = UsageLogEntry {
        id: new_id(),
        user_id: user.id.clone(),
        user: user.display_name().to_string(),
        resource,
        quantity,
        timestamp: at,
        action,
    };
    data.usage_log.push(entry.clone());
    entry
}

/// Component events, newest first.
pub fn component_log(store: &ClubStore) -> Vec<UsageLogEntry> {
    filtered(store, |r| matches!(r, LoggedResource::Component { .. }))
}

/// Lab key events, newest first.
pub fn key_log(store: &ClubStore) -> Vec<UsageLogEntry> {
    filtered(store, |r| matches!(r, LoggedResource::LabKey))
}

/// The whole trail, newest first.
pub fn full_log(store: &ClubStore) -> Vec<UsageLogEntry> {
    filtered(store, |_| true)
}

fn filtered(store: &ClubStore, keep: impl Fn(&LoggedResource) -> bool) -> Vec<UsageLogEntry> {
    let data = club::read(store);
    data.usage_log
        .iter()
        .rev()
        .filter(|e| keep(&e.resource))
        .cloned()
        .collect()
}
