//! Profile and theme handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use cafe_passport_core::Theme;

use crate::db::{UserRepository, VisitRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::ProfileOverview;
use crate::state::AppState;

/// The caller's profile with visits and wishlist.
///
/// GET /api/profile
///
/// # Errors
///
/// Returns 404 if the profile row is missing.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileOverview>> {
    let profile = UserRepository::new(state.pool())
        .get_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".to_string()))?;
    let visits = VisitRepository::new(state.pool())
        .summaries(user.id, None)
        .await?;
    let wishlist = WishlistRepository::new(state.pool()).list(user.id).await?;

    Ok(Json(ProfileOverview {
        username: user.username,
        profile,
        visits,
        wishlist,
    }))
}

/// The caller's theme; `default` when logged out.
///
/// GET /api/profile/theme
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn current_theme(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<serde_json::Value>> {
    let theme = match user {
        Some(user) => UserRepository::new(state.pool())
            .get_theme(user.id)
            .await?
            .unwrap_or_default(),
        None => Theme::default(),
    };

    Ok(Json(json!({ "status": "success", "theme": theme })))
}

/// Switch the caller's theme. Setting the current theme again is a no-op.
///
/// POST /api/profile/theme/{theme}
///
/// # Errors
///
/// Returns 400 for an unknown theme name; the stored theme is unchanged.
pub async fn set_theme(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let theme = name
        .parse::<Theme>()
        .map_err(|e| AppError::invalid("theme", e.to_string()))?;

    UserRepository::new(state.pool())
        .set_theme(user.id, theme)
        .await?;
    tracing::debug!(user_id = %user.id, %theme, "theme changed");

    Ok(Json(json!({ "status": "success", "theme": theme })))
}
