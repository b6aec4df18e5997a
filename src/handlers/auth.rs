//! Account handlers under `/api/auth`.

use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody, MaybeUser};
use crate::handlers::read_upload;
use crate::response::{message, success_created, success_ok};
use crate::service::media::AVATAR_DIR;
use crate::service::users::{ChangePasswordInput, LoginInput, RegisterInput};
use crate::service::UserService;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use serde_json::json;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let input = RegisterInput::from_body(&body)?;
    let (user, token) = UserService::register(&state.pool, &input).await?;
    let profile = UserService::profile(&state.pool, &state.settings, user.id).await?;
    Ok(success_created(message(
        "registration successful",
        json!({ "user": profile, "token": token }),
    )))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let input = LoginInput::from_body(&body)?;
    let user = UserService::authenticate(&state.pool, &input).await?;
    let token = UserService::get_or_create_token(&state.pool, user.id).await?;
    let profile = UserService::profile(&state.pool, &state.settings, user.id).await?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(success_ok(message(
        "login successful",
        json!({ "user": profile, "token": token }),
    )))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    UserService::logout(&state.pool, user.id).await?;
    Ok(success_ok(message("logout successful", json!({}))))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::profile(&state.pool, &state.settings, user.id).await?;
    Ok(success_ok(profile))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::update_profile(&state.pool, &state.settings, user.id, &body).await?;
    Ok(success_ok(message("profile updated", json!({ "user": profile }))))
}

/// POST /api/auth/profile/avatar: multipart field `avatar`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload(multipart, "avatar").await?;
    let file = form
        .file
        .ok_or_else(|| AppError::field("avatar", "No file was submitted."))?;
    let media = state.media();
    let path = media
        .save(
            "avatar",
            AVATAR_DIR,
            file.file_name.as_deref(),
            file.content_type.as_deref(),
            &file.bytes,
        )
        .await?;
    let previous = match UserService::set_avatar(&state.pool, user.id, &path).await {
        Ok(previous) => previous,
        Err(e) => {
            media.remove_all(&[path]).await;
            return Err(e);
        }
    };
    if let Some(old) = previous {
        media.remove_all(&[old]).await;
    }
    let profile = UserService::profile(&state.pool, &state.settings, user.id).await?;
    Ok(success_ok(message("avatar updated", json!({ "user": profile }))))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let input = ChangePasswordInput::from_body(&body)?;
    UserService::change_password(&state.pool, &user, &input).await?;
    Ok(success_ok(message("password changed", json!({}))))
}

/// GET /api/auth/check-auth
pub async fn check_auth(
    State(state): State<AppState>,
    caller: MaybeUser,
) -> Result<impl IntoResponse, AppError> {
    let body = match caller.0 {
        Some(user) => {
            let profile = UserService::profile(&state.pool, &state.settings, user.id).await?;
            json!({ "is_authenticated": true, "user": profile })
        }
        None => json!({ "is_authenticated": false }),
    };
    Ok(success_ok(body))
}
