//! Typed HTTP client for the clubdesk API.
//!
//! One call per action, no retries: a failed call leaves the caller's view
//! as it was and the next successful read brings it back in line.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Component, Presence, PresenceEvent, ScheduleItem, UsageLogEntry, User};
use crate::routes::auth_routes::TokenResponse;
use crate::routes::component_routes::UseRequest;
use crate::services::component_service::{ComponentView, Holding, NewComponent, Returned};
use crate::services::key_service::KeyView;
use crate::services::presence_service::PresentMember;
use crate::services::schedule_service::NewSchedule;
use crate::services::user_service::{NewUser, ProfileUpdate};

#[derive(Error, Debug)]
pub enum ClientError {
    /// No token, or the server no longer accepts it. Log in again.
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Key already held, insufficient stock and similar state clashes.
    #[error("conflict ({code}): {message}")]
    Conflict { code: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),
}

impl ClientError {
    /// Server error code for conflicts (`key_held`, `insufficient_stock`, ...).
    pub fn conflict_code(&self) -> Option<&str> {
        match self {
            ClientError::Conflict { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClubClient {
    base: String,
    http: Client,
    token: Option<String>,
}

impl ClubClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self.http.request(method, format!("{}{}", self.base, path));
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send<T: DeserializeOwned>(rb: RequestBuilder) -> Result<T, ClientError> {
        let resp = rb.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let code = body["error"]["code"].as_str().unwrap_or_default().to_string();
        let message = body["error"]["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or(text);

        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict { code, message },
            _ => ClientError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::send(self.request(Method::GET, path)).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::send(self.request(Method::POST, path)).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        Self::send(self.request(Method::POST, path).json(body)).await
    }

    // ── auth ────────────────────────────────────────────────

    /// Log in and keep the token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let rb = self
            .http
            .post(format!("{}/auth/login", self.base))
            .form(&[("username", username), ("password", password)]);
        let token: TokenResponse = Self::send(rb).await?;
        self.token = Some(token.access_token);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let _: Value = self.post("/auth/logout").await?;
        self.token = None;
        Ok(())
    }

    // ── users ───────────────────────────────────────────────

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/users/me").await
    }

    pub async fn update_me(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        Self::send(self.request(Method::PUT, "/users/me").json(update)).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.get("/users/").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ClientError> {
        self.post_json("/users/", user).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<User, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/users/{id}"))).await
    }

    // ── components ──────────────────────────────────────────

    pub async fn list_components(&self) -> Result<Vec<ComponentView>, ClientError> {
        self.get("/components/").await
    }

    pub async fn create_component(&self, component: &NewComponent) -> Result<Component, ClientError> {
        self.post_json("/components/", component).await
    }

    pub async fn delete_component(&self, id: &str) -> Result<Component, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/components/{id}"))).await
    }

    pub async fn use_component(&self, id: &str, quantity: u32) -> Result<ComponentView, ClientError> {
        self.post_json(&format!("/components/{id}/use"), &UseRequest { quantity })
            .await
    }

    pub async fn return_component(&self, id: &str) -> Result<Returned, ClientError> {
        self.post(&format!("/components/{id}/return")).await
    }

    pub async fn my_holdings(&self) -> Result<Vec<Holding>, ClientError> {
        self.get("/components/mine").await
    }

    pub async fn usage_log(&self) -> Result<Vec<UsageLogEntry>, ClientError> {
        self.get("/components/usage").await
    }

    /// Key and component events together, newest first. Admin only.
    pub async fn full_usage_log(&self) -> Result<Vec<UsageLogEntry>, ClientError> {
        self.get("/usage").await
    }

    // ── keys ────────────────────────────────────────────────

    pub async fn key_state(&self) -> Result<KeyView, ClientError> {
        self.get("/keys/state").await
    }

    pub async fn toggle_key(&self) -> Result<KeyView, ClientError> {
        self.post("/keys/toggle").await
    }

    pub async fn key_history(&self) -> Result<Vec<UsageLogEntry>, ClientError> {
        self.get("/keys/history").await
    }

    // ── presence ────────────────────────────────────────────

    pub async fn my_presence(&self) -> Result<Presence, ClientError> {
        self.get("/presence/me").await
    }

    pub async fn toggle_presence(&self) -> Result<Presence, ClientError> {
        self.post("/presence/toggle").await
    }

    pub async fn present_members(&self) -> Result<Vec<PresentMember>, ClientError> {
        self.get("/presence/members").await
    }

    pub async fn presence_history(&self) -> Result<Vec<PresenceEvent>, ClientError> {
        self.get("/presence/history").await
    }

    // ── schedule ────────────────────────────────────────────

    pub async fn list_schedule(&self, mine_only: bool) -> Result<Vec<ScheduleItem>, ClientError> {
        if mine_only {
            self.get("/schedule/?mine=true").await
        } else {
            self.get("/schedule/").await
        }
    }

    pub async fn create_schedule(&self, item: &NewSchedule) -> Result<ScheduleItem, ClientError> {
        self.post_json("/schedule/", item).await
    }

    pub async fn complete_schedule(&self, id: &str) -> Result<ScheduleItem, ClientError> {
        self.post(&format!("/schedule/{id}/complete")).await
    }
}
