use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{new_id, Presence, PresenceEvent, User, UserId};
use crate::state::club::{self, ClubStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentMember {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub since: Option<DateTime<Utc>>,
}

pub fn me(store: &ClubStore, user: &User) -> Presence {
    club::read(store)
        .presence
        .get(&user.id)
        .cloned()
        .unwrap_or_default()
}

/// Flip the caller's in-lab flag.
pub fn toggle(store: &ClubStore, user: &User) -> Presence {
    toggle_at(store, user, Utc::now())
}

pub fn toggle_at(store: &ClubStore, user: &User, now: DateTime<Utc>) -> Presence {
    let mut data = club::write(store);

    let current = data.presence.entry(user.id.clone()).or_default();
    *current = if current.is_present {
        Presence::default()
    } else {
        Presence {
            is_present: true,
            since: Some(now),
        }
    };
    let updated = current.clone();

    data.presence_log.push(PresenceEvent {
        id: new_id(),
        user_id: user.id.clone(),
        user: user.display_name().to_string(),
        is_present: updated.is_present,
        timestamp: now,
    });

    tracing::info!(
        "{} is {} the lab",
        user.username,
        if updated.is_present { "in" } else { "out of" }
    );
    updated
}

/// Members currently in the lab, earliest arrival first.
pub fn present_members(store: &ClubStore) -> Vec<PresentMember> {
    let data = club::read(store);
    let mut out: Vec<PresentMember> = data
        .presence
        .iter()
        .filter(|(_, p)| p.is_present)
        .filter_map(|(id, p)| {
            data.user(id).ok().map(|u| PresentMember {
                id: u.id.clone(),
                username: u.username.clone(),
                name: u.display_name().to_string(),
                since: p.since,
            })
        })
        .collect();
    out.sort_by(|a, b| a.since.cmp(&b.since).then_with(|| a.username.cmp(&b.username)));
    out
}

/// Check-in/check-out events, newest first.
pub fn history(store: &ClubStore) -> Vec<PresenceEvent> {
    club::read(store).presence_log.iter().rev().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_service::{self, NewUser};
    use crate::state::new_store;
    use chrono::Duration;

    fn member(store: &ClubStore, username: &str) -> User {
        user_service::create(
            store,
            NewUser {
                username: username.into(),
                password: "pw".into(),
                ..NewUser::default()
            },
        )
        .expect("create user")
    }

    #[test]
    fn toggle_flips_and_clears_since() {
        let store = new_store();
        let a = member(&store, "alice");
        assert!(!me(&store, &a).is_present);

        let p = toggle(&store, &a);
        assert!(p.is_present);
        assert!(p.since.is_some());

        let p = toggle(&store, &a);
        assert_eq!(p, Presence::default());
        assert_eq!(history(&store).len(), 2);
        assert!(!history(&store)[0].is_present);
    }

    #[test]
    fn members_list_only_present_users_in_arrival_order() {
        let store = new_store();
        let a = member(&store, "alice");
        let b = member(&store, "bob");
        let c = member(&store, "carol");
        let t0 = Utc::now();

        toggle_at(&store, &b, t0);
        toggle_at(&store, &a, t0 + Duration::minutes(5));
        toggle_at(&store, &c, t0 + Duration::minutes(6));
        toggle_at(&store, &c, t0 + Duration::minutes(7));

        let names: Vec<String> = present_members(&store)
            .into_iter()
            .map(|m| m.username)
            .collect();
        assert_eq!(names, vec!["bob", "alice"]);
    }
}
