//! Entry handlers, including likes, edit history and image uploads.

use crate::error::AppError;
use crate::extractors::{CurrentUser, JsonBody, MaybeUser};
use crate::handlers::{page, parse_id, read_upload};
use crate::response::{success_created, success_many, success_ok, success_page};
use crate::service::entries::filter_from_query;
use crate::service::media::ENTRY_IMAGE_DIR;
use crate::service::validation::{RequestValidator, ValidationRule};
use crate::service::{EntryChanges, EntryService};
use crate::state::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// GET /api/entries?search=&category=&author=&limit=&offset=
pub async fn list(
    State(state): State<AppState>,
    _caller: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = filter_from_query(&params);
    let (limit, offset) = page(&params);
    let (rows, total) = EntryService::list(&state.pool, &filter, limit, offset).await?;
    Ok(success_page(rows, total))
}

/// GET /api/entries/:id counts a view.
pub async fn read(
    State(state): State<AppState>,
    caller: MaybeUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let entry = EntryService::retrieve(&state.pool, &state.settings, id, caller.id()).await?;
    Ok(success_ok(entry))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let changes = EntryChanges::from_body(&body, false)?;
    let entry = EntryService::create(&state.pool, &state.settings, user.id, &changes).await?;
    Ok(success_created(entry))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    write(&state, user.id, &id_str, &body, false).await
}

pub async fn partial_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    write(&state, user.id, &id_str, &body, true).await
}

async fn write(
    state: &AppState,
    editor_id: i64,
    id_str: &str,
    body: &Map<String, Value>,
    partial: bool,
) -> Result<Response, AppError> {
    let id = parse_id(id_str)?;
    let changes = EntryChanges::from_body(body, partial)?;
    let entry = EntryService::update(&state.pool, &state.settings, id, editor_id, &changes).await?;
    Ok(success_ok(entry).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let files = EntryService::delete(&state.pool, id).await?;
    state.media().remove_all(&files).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/entries/:id/like
pub async fn like(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let like_count = EntryService::like(&state.pool, id).await?;
    Ok(success_ok(json!({ "status": "liked", "like_count": like_count })))
}

/// GET /api/entries/:id/history
pub async fn history(
    State(state): State<AppState>,
    _caller: MaybeUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let items = EntryService::history(&state.pool, id).await?;
    Ok(success_many(items))
}

/// POST /api/entries/:id/images: multipart fields `image` and optional `caption`.
pub async fn upload_image(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id_str): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    EntryService::row(&state.pool, id).await?;
    let form = read_upload(multipart, "image").await?;
    let caption = form.fields.get("caption").cloned().unwrap_or_default();
    let mut meta = Map::new();
    meta.insert("caption".into(), Value::String(caption.clone()));
    RequestValidator::validate(&meta, &[("caption", ValidationRule::string().blank().max_length(200))])?;
    let file = form
        .file
        .ok_or_else(|| AppError::field("image", "No file was submitted."))?;
    let media = state.media();
    let path = media
        .save(
            "image",
            ENTRY_IMAGE_DIR,
            file.file_name.as_deref(),
            file.content_type.as_deref(),
            &file.bytes,
        )
        .await?;
    match EntryService::add_image(&state.pool, &state.settings, id, &path, &caption).await {
        Ok(image) => Ok(success_created(image)),
        Err(e) => {
            media.remove_all(&[path]).await;
            Err(e)
        }
    }
}

/// DELETE /api/entries/:id/images/:image_id
pub async fn delete_image(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path((id_str, image_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let image_id = parse_id(&image_str)?;
    let path = EntryService::delete_image(&state.pool, id, image_id).await?;
    state.media().remove_all(&[path]).await;
    Ok(StatusCode::NO_CONTENT)
}
