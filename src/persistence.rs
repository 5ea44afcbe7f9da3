use std::{fs, io, path::Path};

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::models::KeyState;
use crate::state::club::{self, ClubData, ClubStore};

const SNAPSHOT_FORMAT: u32 = 1;

lazy_static! {
    /// Autosave and the shutdown save share one temp file; only one writes at a time.
    static ref SAVE_LOCK: Mutex<()> = Mutex::new(());
}

/// On-disk wrapper around the persistent parts of the store.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: u32,
    saved_at: DateTime<Utc>,
    data: ClubData,
}

/// Load snapshot from disk into memory.
///
/// A missing or unreadable snapshot leaves the store empty; the server
/// still starts.
pub async fn load_snapshot(path: &str, store: &ClubStore) {
    let text = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(_) => {
            tracing::info!("No snapshot found at startup (path = {})", path);
            return;
        }
    };

    let snapshot: Snapshot = match serde_json::from_str(&text) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to parse snapshot JSON: {e}");
            return;
        }
    };

    if snapshot.format != SNAPSHOT_FORMAT {
        tracing::warn!(
            "Snapshot format {} is not supported (expected {}), ignoring",
            snapshot.format,
            SNAPSHOT_FORMAT
        );
        return;
    }

    let mut data = snapshot.data;
    reconcile(&mut data);

    let mut guard = club::write(store);
    *guard = data;

    tracing::info!(
        "Loaded snapshot from {}: {} users, {} components, {} log entries",
        snapshot.saved_at,
        guard.accounts.len(),
        guard.components.len(),
        guard.usage_log.len()
    );
}

/// Restore the ledger invariants on data that came from disk.
///
/// `in_use` is rebuilt from the per-user holdings, holdings of unknown
/// users or components are dropped, and a key held by a missing user
/// is freed.
pub(crate) fn reconcile(data: &mut ClubData) {
    let accounts = &data.accounts;
    let components = &data.components;
    data.holdings.retain(|user_id, held| {
        held.retain(|cid, q| *q > 0 && components.contains_key(cid));
        accounts.contains_key(user_id) && !held.is_empty()
    });

    let ids: Vec<String> = data.components.keys().cloned().collect();
    for id in ids {
        let held = data.held_total(&id);
        if let Some(component) = data.components.get_mut(&id) {
            if component.in_use != held {
                tracing::warn!(
                    "Component '{}' recorded {} in use but holdings sum to {}; using holdings",
                    component.name,
                    component.in_use,
                    held
                );
                component.in_use = held;
            }
            if component.quantity < component.in_use {
                tracing::warn!(
                    "Component '{}' has more units out ({}) than stocked ({}); raising quantity",
                    component.name,
                    component.in_use,
                    component.quantity
                );
                component.quantity = component.in_use;
            }
        }
    }

    let key_ok = match (&data.key.current_holder_id, data.key.is_in_use) {
        (Some(holder), true) => data.accounts.contains_key(holder) && data.key.taken_at.is_some(),
        (None, false) => data.key.taken_at.is_none(),
        _ => false,
    };
    if !key_ok {
        tracing::warn!("Snapshot key state was inconsistent, marking the key as free");
        data.key = KeyState::default();
    }
}

fn write_snapshot(path: &str, data: ClubData) -> io::Result<()> {
    let snapshot = Snapshot {
        format: SNAPSHOT_FORMAT,
        saved_at: Utc::now(),
        data,
    };
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    // Write next to the target and rename, so a crash never leaves a torn file.
    let tmp = format!("{path}.tmp");
    fs::write(&tmp, json.as_bytes())?;
    fs::rename(&tmp, Path::new(path))
}

/// Save the current club state to `path`. Sessions are not written.
pub async fn save_snapshot(path: &str, store: &ClubStore) {
    let _saving = SAVE_LOCK.lock().await;
    let data = club::read(store).clone(); // release lock before I/O

    match write_snapshot(path, data) {
        Ok(()) => tracing::info!("Snapshot saved"),
        Err(e) => tracing::warn!("Failed to write snapshot file {}: {e}", path),
    }
}

/// Background task that periodically saves the snapshot.
pub async fn autosave_loop(path: String, store: ClubStore, every_sec: u64) {
    loop {
        sleep(Duration::from_secs(every_sec)).await;
        save_snapshot(&path, &store).await;
    }
}
