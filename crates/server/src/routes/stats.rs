//! Stats handler.

use axum::{Json, extract::State};

use crate::db::StatsRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::UserStats;
use crate::services::stats::summarize;
use crate::state::AppState;

/// The caller's visit, wishlist, favorite-item and tag statistics.
///
/// GET /api/stats
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserStats>> {
    let raw = StatsRepository::new(state.pool()).raw(user.id).await?;
    Ok(Json(summarize(raw)))
}
