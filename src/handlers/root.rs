use crate::response::success_ok;
use axum::response::IntoResponse;
use serde_json::json;

/// GET /api: what the API offers.
pub async fn api_root() -> impl IntoResponse {
    success_ok(json!({
        "message": "Baike encyclopedia API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth/",
            "categories": "/api/categories/",
            "entries": "/api/entries/",
            "favorites": "/api/favorites/",
            "search": "/api/search/",
            "statistics": "/api/encyclopedia/statistics/"
        }
    }))
}
