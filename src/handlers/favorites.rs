//! The caller's favorites.

use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody};
use crate::handlers::{page, parse_id};
use crate::response::{success_created, success_ok, success_page};
use crate::service::favorites::entry_from_body;
use crate::service::FavoriteService;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use std::collections::HashMap;

pub const ENTRY_ID_REQUIRED: &str = "entry_id parameter is required";

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&params);
    let (rows, total) = FavoriteService::list(&state.pool, user.id, limit, offset).await?;
    Ok(success_page(rows, total))
}

pub async fn read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    Ok(success_ok(FavoriteService::get(&state.pool, user.id, id).await?))
}

/// POST /api/favorites with `{"entry": id}`.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let entry_id = entry_from_body(&body)?;
    FavoriteService::create(&state.pool, user.id, entry_id).await?;
    Ok(success_created(json!({ "status": "favorited" })))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    FavoriteService::delete(&state.pool, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/favorites/check?entry_id=N
pub async fn check(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entry_id = params
        .get("entry_id")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::BadRequest(ENTRY_ID_REQUIRED.into()))?;
    let is_favorited = FavoriteService::check(&state.pool, user.id, entry_id).await?;
    Ok(success_ok(json!({ "is_favorited": is_favorited })))
}
