use axum::extract::FromRef;

use crate::state::club::{new_store, ClubStore};

/// In-memory shared application state handed to every router.
#[derive(Clone)]
pub struct AppState {
    pub store: ClubStore,

    /// Lifetime of newly issued bearer tokens, in seconds.
    pub token_ttl_seconds: Option<u64>,
}

impl AppState {
    pub fn new(store: ClubStore, token_ttl_seconds: Option<u64>) -> Self {
        Self {
            store,
            token_ttl_seconds,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(new_store(), None)
    }
}

impl FromRef<AppState> for ClubStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
