use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ClubError;
use crate::models::{new_id, Account, Role, User};
use crate::services::auth_service::hash_password;
use crate::state::club::{self, ClubStore};

const MAX_USERNAME_LEN: usize = 64;

/// Payload of `POST /users/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(rename = "class", default)]
    pub class_name: Option<String>,
}

/// Payload of `PUT /users/me`. Absent fields are left alone, empty
/// strings clear the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(rename = "class", default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn apply(field: &mut Option<String>, update: Option<String>) {
    if let Some(v) = update {
        *field = non_blank(Some(v));
    }
}

fn validate_username(username: &str) -> Result<(), ClubError> {
    if username.is_empty() {
        return Err(ClubError::Validation("username must not be empty".into()));
    }
    if username.len() > MAX_USERNAME_LEN || username.chars().any(char::is_whitespace) {
        return Err(ClubError::Validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters without spaces"
        )));
    }
    Ok(())
}

pub fn create(store: &ClubStore, req: NewUser) -> Result<User, ClubError> {
    let username = req.username.trim().to_string();
    validate_username(&username)?;
    if req.password.is_empty() {
        return Err(ClubError::Validation("password must not be empty".into()));
    }

    let mut data = club::write(store);

    if data.find_by_username(&username).is_some() {
        return Err(ClubError::Conflict(format!(
            "username '{username}' is already taken"
        )));
    }

    let user = User {
        id: new_id(),
        username,
        role: req.role.unwrap_or_default(),
        name: non_blank(req.name),
        email: non_blank(req.email),
        department: non_blank(req.department),
        class_name: non_blank(req.class_name),
    };

    data.accounts.insert(
        user.id.clone(),
        Account {
            user: user.clone(),
            password: hash_password(&req.password),
            created_at: Utc::now(),
        },
    );

    tracing::info!("Created {:?} account '{}'", user.role, user.username);
    Ok(user)
}

/// All users, ordered by username.
pub fn list(store: &ClubStore) -> Vec<User> {
    let data = club::read(store);
    let mut users: Vec<User> = data.accounts.values().map(|a| a.user.clone()).collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    users
}

pub fn get(store: &ClubStore, id: &str) -> Result<User, ClubError> {
    club::read(store).user(id).cloned()
}

pub fn update_profile(
    store: &ClubStore,
    id: &str,
    update: ProfileUpdate,
) -> Result<User, ClubError> {
    if update.password.as_deref() == Some("") {
        return Err(ClubError::Validation("password must not be empty".into()));
    }

    let mut data = club::write(store);
    let account = data
        .accounts
        .get_mut(id)
        .ok_or(ClubError::NotFound("User"))?;

    apply(&mut account.user.name, update.name);
    apply(&mut account.user.email, update.email);
    apply(&mut account.user.department, update.department);
    apply(&mut account.user.class_name, update.class_name);
    if let Some(password) = update.password {
        account.password = hash_password(&password);
    }

    Ok(account.user.clone())
}

/// Remove a user on behalf of `actor_id`.
///
/// Users still holding the key or components cannot be removed, otherwise
/// their units would stay counted in `in_use` with nobody able to return them.
pub fn delete(store: &ClubStore, actor_id: &str, target_id: &str) -> Result<User, ClubError> {
    if actor_id == target_id {
        return Err(ClubError::Conflict(
            "you cannot delete your own account".into(),
        ));
    }

    let mut data = club::write(store);
    let user = data.user(target_id)?.clone();

    if data.key.is_held_by(target_id) {
        return Err(ClubError::Conflict(format!(
            "{} is holding the lab key",
            user.username
        )));
    }
    if data
        .holdings
        .get(target_id)
        .is_some_and(|m| m.values().any(|&q| q > 0))
    {
        return Err(ClubError::Conflict(format!(
            "{} still holds components",
            user.username
        )));
    }

    data.accounts.remove(target_id);
    data.holdings.remove(target_id);
    data.presence.remove(target_id);
    data.sessions.retain(|_, s| s.user_id != target_id);
    for item in data.schedule.iter_mut() {
        item.assigned_to.retain(|id| id != target_id);
    }

    tracing::info!("Deleted user '{}'", user.username);
    Ok(user)
}

/// Create the configured administrator if no admin exists yet.
///
/// A member already using the configured username is left alone.
pub fn bootstrap_admin(
    store: &ClubStore,
    username: &str,
    password: &str,
) -> Result<Option<User>, ClubError> {
    let has_admin = club::read(store)
        .accounts
        .values()
        .any(|a| a.user.is_admin());
    if has_admin {
        return Ok(None);
    }
    if club::read(store).find_by_username(username).is_some() {
        tracing::warn!(
            "No administrator exists and '{}' is already a member account; not creating an admin",
            username
        );
        return Ok(None);
    }

    create(
        store,
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            role: Some(Role::Admin),
            ..NewUser::default()
        },
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{component_service, key_service, schedule_service};
    use crate::state::new_store;

    fn member(store: &ClubStore, username: &str) -> User {
        create(
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
    fn usernames_are_unique_case_insensitively() {
        let store = new_store();
        member(&store, "ada");
        let err = create(
            &store,
            NewUser {
                username: "ADA".into(),
                password: "pw".into(),
                ..NewUser::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ClubError::Conflict(_)));
    }

    #[test]
    fn blank_username_is_rejected() {
        let store = new_store();
        let err = create(
            &store,
            NewUser {
                username: "  ".into(),
                password: "pw".into(),
                ..NewUser::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ClubError::Validation(_)));
    }

    #[test]
    fn profile_update_sets_and_clears_fields() {
        let store = new_store();
        let ada = member(&store, "ada");

        let updated = update_profile(
            &store,
            &ada.id,
            ProfileUpdate {
                name: Some("Ada Lovelace".into()),
                class_name: Some("Senior".into()),
                ..ProfileUpdate::default()
            },
        )
        .expect("update");
        assert_eq!(updated.display_name(), "Ada Lovelace");
        assert_eq!(updated.class_name.as_deref(), Some("Senior"));

        let cleared = update_profile(
            &store,
            &ada.id,
            ProfileUpdate {
                name: Some(String::new()),
                ..ProfileUpdate::default()
            },
        )
        .expect("update");
        assert_eq!(cleared.name, None);
        assert_eq!(cleared.class_name.as_deref(), Some("Senior"));
    }

    #[test]
    fn cannot_delete_self_or_key_holder_or_component_holder() {
        let store = new_store();
        let admin = bootstrap_admin(&store, "root", "pw")
            .expect("bootstrap")
            .expect("created");
        let ada = member(&store, "ada");
        let bob = member(&store, "bob");

        assert!(matches!(
            delete(&store, &admin.id, &admin.id),
            Err(ClubError::Conflict(_))
        ));

        key_service::toggle(&store, &ada).expect("take key");
        assert!(matches!(
            delete(&store, &admin.id, &ada.id),
            Err(ClubError::Conflict(_))
        ));

        let c = component_service::create(
            &store,
            component_service::NewComponent {
                name: "Servo".into(),
                description: None,
                image: None,
                quantity: 4,
            },
        )
        .expect("component");
        component_service::use_units(&store, &c.id, 1, &bob).expect("use");
        assert!(matches!(
            delete(&store, &admin.id, &bob.id),
            Err(ClubError::Conflict(_))
        ));

        component_service::return_units(&store, &c.id, &bob).expect("return");
        let removed = delete(&store, &admin.id, &bob.id).expect("delete");
        assert_eq!(removed.username, "bob");
        assert_eq!(get(&store, &bob.id), Err(ClubError::NotFound("User")));
    }

    #[test]
    fn bootstrap_admin_runs_once() {
        let store = new_store();
        assert!(bootstrap_admin(&store, "root", "pw").expect("first").is_some());
        assert!(bootstrap_admin(&store, "root2", "pw").expect("second").is_none());
        assert_eq!(list(&store).len(), 1);
    }

    #[test]
    fn bootstrap_admin_skips_a_taken_username() {
        let store = new_store();
        let existing = member(&store, "admin");
        assert_eq!(bootstrap_admin(&store, "admin", "pw"), Ok(None));
        assert_eq!(list(&store), vec![existing]);
    }

    #[test]
    fn delete_drops_user_from_schedule_assignments() {
        let store = new_store();
        let admin = bootstrap_admin(&store, "root", "pw")
            .expect("bootstrap")
            .expect("created");
        let ada = member(&store, "ada");
        let bob = member(&store, "bob");

        let item = schedule_service::create(
            &store,
            schedule_service::NewSchedule {
                date: Utc::now(),
                task: "Label drawers".into(),
                assigned_to: vec![ada.id.clone(), bob.id.clone()],
            },
        )
        .expect("schedule");

        delete(&store, &admin.id, &bob.id).expect("delete");

        let items = schedule_service::list(&store, &ada, false);
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].assigned_to, vec![ada.id.clone()]);
    }
}
