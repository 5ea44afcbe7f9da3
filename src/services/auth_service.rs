use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::ClubError;
use crate::models::{PasswordHash, Session, User};
use crate::state::club::{self, ClubStore};

/// Upper bound on configured token lifetimes (ten years).
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 3600;

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    let hash = digest_password(&salt, password);
    PasswordHash { salt, hash }
}

pub fn verify_password(stored: &PasswordHash, password: &str) -> bool {
    let candidate = digest_password(&stored.salt, password);
    candidate.as_bytes().ct_eq(stored.hash.as_bytes()).into()
}

/// Only this digest of a bearer token is ever stored.
fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn new_token() -> String {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Check credentials and open a session. Returns the bearer token.
///
/// Unknown usernames and wrong passwords fail the same way.
pub fn login(
    store: &ClubStore,
    username: &str,
    password: &str,
    ttl_seconds: Option<u64>,
    now: DateTime<Utc>,
) -> Result<String, ClubError> {
    let mut data = club::write(store);

    let user_id = match data.find_by_username(username.trim()) {
        Some(account) if verify_password(&account.password, password) => account.user.id.clone(),
        _ => {
            tracing::info!("Rejected login for '{}'", username);
            return Err(ClubError::Unauthenticated);
        }
    };

    data.sessions
        .retain(|_, s| s.expires_at.map_or(true, |exp| exp > now));

    let token = new_token();
    let expires_at =
        ttl_seconds.map(|ttl| now + Duration::seconds(ttl.min(MAX_TTL_SECONDS) as i64));

    data.sessions.insert(
        token_digest(&token),
        Session {
            user_id: user_id.clone(),
            created_at: now,
            expires_at,
        },
    );

    tracing::info!("User {} logged in", user_id);
    Ok(token)
}

/// Revoke a token. Returns whether it was live.
pub fn logout(store: &ClubStore, token: &str) -> bool {
    let mut data = club::write(store);
    data.sessions.remove(&token_digest(token)).is_some()
}

/// Resolve a bearer token to its user.
pub fn authenticate(store: &ClubStore, token: &str, now: DateTime<Utc>) -> Result<User, ClubError> {
    let data = club::read(store);

    let session = data
        .sessions
        .get(&token_digest(token))
        .ok_or(ClubError::Unauthenticated)?;

    if session.expires_at.is_some_and(|exp| exp <= now) {
        return Err(ClubError::Unauthenticated);
    }

    // Deleted users lose access even if a token is still around.
    data.user(&session.user_id)
        .cloned()
        .map_err(|_| ClubError::Unauthenticated)
}
