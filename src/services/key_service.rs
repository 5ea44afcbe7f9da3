use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::MAX_KEY_HOLD_SECONDS;
use crate::errors::ClubError;
use crate::models::{Action, KeyState, LoggedResource, User, UserId};
use crate::services::usage_service;
use crate::state::club::{self, ClubData, ClubStore};

/// Key state as presented to one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyView {
    pub is_in_use: bool,
    pub current_holder_id: Option<UserId>,
    pub current_holder: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub held_by_me: bool,
}

fn view(data: &ClubData, viewer_id: &str) -> KeyView {
    let key = &data.key;
    KeyView {
        is_in_use: key.is_in_use,
        current_holder_id: key.current_holder_id.clone(),
        current_holder: key
            .current_holder_id
            .as_deref()
            .and_then(|id| data.user(id).ok())
            .map(|u| u.display_name().to_string()),
        taken_at: key.taken_at,
        held_by_me: key.is_held_by(viewer_id),
    }
}

pub fn state(store: &ClubStore, viewer: &User) -> KeyView {
    view(&club::read(store), &viewer.id)
}

impl KeyView {
    /// View of the state `toggle` just produced for `actor`. After a
    /// successful toggle the key is either free or held by the actor.
    pub fn after_toggle(state: KeyState, actor: &User) -> Self {
        let held = state.is_held_by(&actor.id);
        KeyView {
            is_in_use: state.is_in_use,
            current_holder: held.then(|| actor.display_name().to_string()),
            current_holder_id: state.current_holder_id,
            taken_at: state.taken_at,
            held_by_me: held,
        }
    }
}

/// Take the key if it is free, hand it back if the caller holds it.
///
/// Check and update happen under one write guard, so of two members racing
/// for a free key exactly one wins and the other gets `KeyHeldByOther`.
pub fn toggle(store: &ClubStore, user: &User) -> Result<KeyState, ClubError> {
    toggle_at(store, user, Utc::now())
}

pub fn toggle_at(store: &ClubStore, user: &User, now: DateTime<Utc>) -> Result<KeyState, ClubError> {
    let mut data = club::write(store);

    if !data.key.is_in_use {
        data.key = KeyState {
            is_in_use: true,
            current_holder_id: Some(user.id.clone()),
            taken_at: Some(now),
        };
        usage_service::record(&mut data, user, LoggedResource::LabKey, 1, Action::Taken, now);
        tracing::info!("Lab key taken by {}", user.username);
    } else if data.key.is_held_by(&user.id) {
        data.key = KeyState::default();
        usage_service::record(&mut data, user, LoggedResource::LabKey, 1, Action::Returned, now);
        tracing::info!("Lab key returned by {}", user.username);
    } else {
        tracing::debug!("{} tried to take the lab key while it is held", user.username);
        return Err(ClubError::KeyHeldByOther);
    }

    Ok(data.key.clone())
}

/// Hand the key back on the holder's behalf once it has been out longer
/// than `max_hold`. Returns the holder when a release happened.
pub fn release_if_expired(store: &ClubStore, max_hold: Duration, now: DateTime<Utc>) -> Option<User> {
    let mut data = club::write(store);

    let taken_at = data.key.taken_at?;
    if now - taken_at <= max_hold {
        return None;
    }

    let holder_id = data.key.current_holder_id.clone()?;
    let holder = data.user(&holder_id).ok().cloned();

    data.key = KeyState::default();
    if let Some(holder) = &holder {
        usage_service::record(&mut data, holder, LoggedResource::LabKey, 1, Action::Returned, now);
    }

    tracing::warn!(
        "Lab key held since {} released automatically (holder {})",
        taken_at,
        holder_id
    );
    holder
}

/// Hold limit as a chrono duration, clamped to `MAX_KEY_HOLD_SECONDS`.
pub fn max_hold_duration(max_hold_seconds: u64) -> Duration {
    let secs = max_hold_seconds.min(MAX_KEY_HOLD_SECONDS);
    Duration::try_seconds(secs as i64).unwrap_or_else(|| Duration::days(10 * 365))
}

/// Background task that periodically reclaims an over-held key.
pub async fn expiry_loop(store: ClubStore, max_hold_seconds: u64, every_sec: u64) {
    let max_hold = max_hold_duration(max_hold_seconds);
    loop {
        sleep(std::time::Duration::from_secs(every_sec)).await;
        release_if_expired(&store, max_hold, Utc::now());
    }
}
