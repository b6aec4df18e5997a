use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::response::success_ok;
use crate::service::StatisticsService;
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;

/// GET /api/encyclopedia/statistics for the caller's own entries.
pub async fn statistics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_ok(StatisticsService::for_author(&state.pool, user.id).await?))
}
