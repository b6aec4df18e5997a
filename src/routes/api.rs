//! Everything under `/api`. Paths are registered without trailing slashes; see [`crate::routes::app`].

use crate::handlers::{auth, categories, entries, favorites, root, search, statistics};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/profile/avatar", post(auth::upload_avatar))
        .route("/change-password", post(auth::change_password))
        .route("/check-auth", get(auth::check_auth))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route(
            "/:id",
            get(categories::read)
                .put(categories::update)
                .patch(categories::partial_update)
                .delete(categories::delete),
        )
}

fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(entries::list).post(entries::create))
        .route(
            "/:id",
            get(entries::read)
                .put(entries::update)
                .patch(entries::partial_update)
                .delete(entries::delete),
        )
        .route("/:id/like", post(entries::like))
        .route("/:id/history", get(entries::history))
        .route("/:id/images", post(entries::upload_image))
        .route("/:id/images/:image_id", delete(entries::delete_image))
}

fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::list).post(favorites::create))
        .route("/check", get(favorites::check))
        .route("/:id", get(favorites::read).delete(favorites::delete))
}

/// The `/api` router. Request bodies, uploads included, are capped at `max_upload_bytes`.
pub fn api_routes(state: AppState) -> Router {
    let max_body = state.settings.max_upload_bytes;
    Router::new()
        .route("/", get(root::api_root))
        .nest("/auth", auth_routes())
        .nest("/categories", category_routes())
        .nest("/entries", entry_routes())
        .nest("/favorites", favorite_routes())
        .route("/search", get(search::search))
        .route("/encyclopedia/statistics", get(statistics::statistics))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .with_state(state)
}
