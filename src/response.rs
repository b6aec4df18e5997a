//! Standard response envelope helpers.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
    /// Rows matching the filters, ignoring limit/offset. Only set on paginated lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data, meta: None }))
}

pub fn success_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta: None }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count, total: None },
        }),
    )
}

/// One page of a list plus the unpaginated total, also exposed as `X-Total-Count`.
pub fn success_page<T: Serialize>(data: Vec<T>, total: i64) -> Response {
    let count = data.len() as u64;
    let mut response = (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount {
                count,
                total: Some(total),
            },
        }),
    )
        .into_response();
    response.headers_mut().insert(
        HeaderName::from_static(TOTAL_COUNT_HEADER),
        HeaderValue::from(total),
    );
    response
}

/// `{"message": ...}` plus any extra top-level fields, wrapped in the success envelope.
pub fn message(text: &str, extra: serde_json::Value) -> serde_json::Value {
    let mut body = serde_json::json!({ "message": text });
    if let (Some(obj), serde_json::Value::Object(more)) = (body.as_object_mut(), extra) {
        obj.extend(more);
    }
    body
}

pub fn error_body(code: &str, message: String, details: Option<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_helpers_are_named_by_status() {
        let (status, Json(body)) = success_created("x");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.data, "x");
        assert_eq!(success_ok("x").0, StatusCode::OK);
    }

    #[test]
    fn page_sets_total_header() {
        let response = success_page(vec![1, 2], 7);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(TOTAL_COUNT_HEADER).unwrap(), "7");
    }

    #[test]
    fn message_merges_extra_fields() {
        let body = message("ok", serde_json::json!({ "token": "abc" }));
        assert_eq!(body["message"], "ok");
        assert_eq!(body["token"], "abc");
    }
}
