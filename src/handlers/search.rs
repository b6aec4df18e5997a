use crate::error::AppError;
use crate::extractors::MaybeUser;
use crate::response::success_ok;
use crate::service::search::query_term;
use crate::service::SearchService;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use std::collections::HashMap;

/// GET /api/search?q=
pub async fn search(
    State(state): State<AppState>,
    _caller: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let q = query_term(params.get("q").map(String::as_str))?;
    Ok(success_ok(SearchService::search(&state.pool, q).await?))
}
