//! Resolve the caller from `Authorization: Token <key>`.

use crate::auth::parse_authorization;
use crate::error::AppError;
use crate::models::User;
use crate::service::UserService;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

/// Caller that must be authenticated; anonymous requests are rejected with 401.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Caller that may be anonymous. A token that is present but invalid is still rejected.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let header = match parts.headers.get(AUTHORIZATION) {
        Some(v) => v
            .to_str()
            .map_err(|_| AppError::Unauthorized("invalid token header: non-ascii characters".into()))?,
        None => return Ok(None),
    };
    let key = match parse_authorization(header)? {
        Some(k) => k,
        None => return Ok(None),
    };
    let user = UserService::by_token(&state.pool, key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid token".into()))?;
    if !user.is_active {
        tracing::warn!(user_id = user.id, "token used by inactive user");
        return Err(AppError::Unauthorized("user inactive or deleted".into()));
    }
    Ok(Some(user))
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeUser(resolve(parts, &state).await?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        resolve(parts, &state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("authentication credentials were not provided".into()))
    }
}
