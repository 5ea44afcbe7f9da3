use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use lazy_static::lazy_static;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::ClubError;

/// Event families a webhook can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Keys,
    Components,
    Presence,
    Schedule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub topic: Topic,
    pub callback: String,
}

/// Payload of `POST /pubsub/subscribe`. The server assigns the id.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub topic: Topic,
    pub callback: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub subscription_id: u64,
}

lazy_static! {
    static ref SUBSCRIPTIONS: Mutex<HashMap<u64, Subscription>> = Mutex::new(HashMap::new());
    static ref HTTP_CLIENT: Client = Client::new();
}

fn subscriptions() -> MutexGuard<'static, HashMap<u64, Subscription>> {
    SUBSCRIPTIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generate a new numeric id for subscriptions.
fn next_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Register a callback and return `{ "subscription_id": <id> }`.
pub fn subscribe(req: SubscribeRequest) -> Result<Value, ClubError> {
    let callback = req.callback.trim().to_string();
    if !(callback.starts_with("http://") || callback.starts_with("https://")) {
        return Err(ClubError::Validation(
            "callback must be an http(s) URL".into(),
        ));
    }

    let id = next_id();
    subscriptions().insert(
        id,
        Subscription {
            id,
            topic: req.topic,
            callback,
        },
    );

    tracing::info!("Webhook {} subscribed to {:?}", id, req.topic);
    Ok(serde_json::json!({ "subscription_id": id }))
}

/// Remove a subscription by id and report if it existed.
pub fn unsubscribe(id: u64) -> Value {
    let existed = subscriptions().remove(&id).is_some();

    serde_json::json!({
        "subscription_id": id,
        "unsubscribed": existed
    })
}

pub fn list() -> Vec<Subscription> {
    let mut out: Vec<Subscription> = subscriptions().values().cloned().collect();
    out.sort_by_key(|s| s.id);
    out
}

/// Fan an event out to every subscriber of `topic`.
///
/// Must run inside the tokio runtime; deliveries are fire-and-forget and
/// failures are only logged.
pub fn publish(topic: Topic, event: &str, payload: Value) {
    // Snapshot matching subscriptions so the lock is not held across HTTP calls.
    let subs: Vec<Subscription> = subscriptions()
        .values()
        .filter(|s| s.topic == topic)
        .cloned()
        .collect();

    if subs.is_empty() {
        return;
    }

    let body = serde_json::json!({
        "topic": topic,
        "event": event,
        "payload": payload,
        "timestamp": Utc::now().to_rfc3339(),
    });

    for sub in subs {
        let body_clone = body.clone();

        tokio::spawn(async move {
            let res = HTTP_CLIENT
                .post(&sub.callback)
                .json(&body_clone)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            if let Err(e) = res {
                warn!("Error sending webhook to {}: {}", sub.callback, e);
            }
        });
    }
}
