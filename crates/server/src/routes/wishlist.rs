//! Wishlist handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use cafe_passport_core::CafeId;

use crate::db::WishlistRepository;
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::WishlistEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub cafe_id: CafeId,
}

/// The caller's wishlist.
///
/// GET /api/wishlist
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistEntry>>> {
    Ok(Json(WishlistRepository::new(state.pool()).list(user.id).await?))
}

/// Add a cafe. Adding it again is not an error.
///
/// POST /api/wishlist
///
/// # Errors
///
/// Returns 404 if the cafe does not exist.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddRequest>,
) -> Result<Response> {
    let (id, created) = WishlistRepository::new(state.pool())
        .add(user.id, request.cafe_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("cafe".to_string()),
            other => other.into(),
        })?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(json!({ "status": "success", "id": id, "created": created })),
    )
        .into_response())
}

/// Remove a cafe.
///
/// DELETE /api/wishlist/{cafe_id}
///
/// # Errors
///
/// Returns 404 if the cafe was not on the wishlist.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(cafe_id): Path<CafeId>,
) -> Result<Json<serde_json::Value>> {
    WishlistRepository::new(state.pool())
        .remove(user.id, cafe_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("wishlist entry".to_string()),
            other => other.into(),
        })?;

    Ok(Json(json!({ "status": "success" })))
}
