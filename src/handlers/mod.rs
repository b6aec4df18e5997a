//! HTTP handlers for the `/api` routes, plus helpers they share.

pub mod auth;
pub mod categories;
pub mod entries;
pub mod favorites;
pub mod root;
pub mod search;
pub mod statistics;

use crate::error::AppError;
use axum::extract::Multipart;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Numeric path id. Anything else cannot name a row, so it is a 404.
fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("no resource with id {:?}", id_str)))
}

/// `limit` and `offset` from the query string; unparsable values fall back to the defaults.
fn page(params: &HashMap<String, String>) -> (u32, u32) {
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    (limit, offset)
}

#[derive(Debug, Default)]
struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

/// Drain a multipart body: the part named `file_field` is kept as bytes, other parts as text.
async fn read_upload(mut multipart: Multipart, file_field: &str) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == file_field {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.file = Some(UploadedFile {
                file_name,
                content_type,
                bytes: data.to_vec(),
            });
        } else {
            let text = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}
