//! Category handlers. Reads are public; writes need a token.

use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody, MaybeUser};
use crate::handlers::{page, parse_id};
use crate::response::{success_created, success_ok, success_page};
use crate::service::{CategoryChanges, CategoryService};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::collections::HashMap;

pub async fn list(
    State(state): State<AppState>,
    _caller: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&params);
    let (rows, total) = CategoryService::list(&state.pool, limit, offset).await?;
    Ok(success_page(rows, total))
}

pub async fn read(
    State(state): State<AppState>,
    _caller: MaybeUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let category = CategoryService::get(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {}", id)))?;
    Ok(success_ok(category))
}

pub async fn create(
    State(state): State<AppState>,
    _caller: CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let changes = CategoryChanges::from_body(&body, false)?;
    let category = CategoryService::create(&state.pool, &changes).await?;
    Ok(success_created(category))
}

/// PUT replaces every writable field.
pub async fn update(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    write(&state, &id_str, &body, false).await
}

/// PATCH changes only the fields sent.
pub async fn partial_update(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    write(&state, &id_str, &body, true).await
}

async fn write(
    state: &AppState,
    id_str: &str,
    body: &serde_json::Map<String, serde_json::Value>,
    partial: bool,
) -> Result<axum::response::Response, AppError> {
    let id = parse_id(id_str)?;
    let changes = CategoryChanges::from_body(body, partial)?;
    let category = CategoryService::update(&state.pool, id, &changes).await?;
    Ok(success_ok(category).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    CategoryService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
