//! Router assembly.

pub mod api;
pub mod common;

pub use api::api_routes;
pub use common::common_routes;

use crate::error::AppError;
use crate::state::AppState;
use axum::response::IntoResponse;
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

async fn not_found(uri: axum::http::Uri) -> impl IntoResponse {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

/// The whole service: common routes, `/api`, and uploaded media under `MEDIA_URL`.
/// Trailing slashes are trimmed before routing, so `/api/entries/` and `/api/entries` are the same route.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let media_url = state.settings.media_url.trim_end_matches('/').to_string();
    let mut router = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api", api_routes(state.clone()));
    // an absolute MEDIA_URL points at another host, which serves the files itself
    if media_url.starts_with('/') && media_url.len() > 1 {
        router = router.nest_service(&media_url, ServeDir::new(&state.settings.media_root));
    }
    let router = router.fallback(not_found).layer(TraceLayer::new_for_http());
    NormalizePathLayer::trim_trailing_slash().layer(router)
}
