//! Request extractors that resolve `Authorization: Bearer <token>`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;

use crate::errors::ClubError;
use crate::models::User;
use crate::services::auth_service;
use crate::state::club::ClubStore;

/// Any logged-in user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

/// A logged-in user with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Pull the token out of an `Authorization` header value.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    ClubStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ClubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer)
            .ok_or(ClubError::Unauthenticated)?
            .to_string();

        let store = ClubStore::from_ref(state);
        let user = auth_service::authenticate(&store, &token, Utc::now())?;
        Ok(AuthUser { user, token })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    ClubStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ClubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ClubError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
