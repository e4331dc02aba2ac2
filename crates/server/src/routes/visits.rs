//! Visit handlers.
//!
//! Create and update take `multipart/form-data`: a `payload` part with the
//! JSON description of the visit plus one file part per uploaded photo.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use cafe_passport_core::{CafeId, FavoriteItemId, VisitId};

use crate::db::VisitRepository;
use crate::db::visits::DeleteOutcome;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{FavoriteItemDetail, VisitDetail};
use crate::services::visit_submission::{
    Mode, SubmissionError, SubmissionReceipt, create_visit, form::read_submission, update_visit,
    validate_submission,
};
use crate::state::AppState;

/// Log a visit to a cafe.
///
/// POST /api/cafes/{id}/visits
///
/// # Errors
///
/// Returns 400 with per-field errors if any row is invalid, 404 if the cafe
/// does not exist and 500 if the transaction fails. Nothing is stored on error.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(cafe_id): Path<CafeId>,
    multipart: Multipart,
) -> Result<Response> {
    let raw = read_submission(multipart, state.config().max_upload_bytes).await?;
    let visit = validate_submission(Mode::Create, raw)?;

    let receipt = create_visit(state.pool(), state.media(), user.id, cafe_id, visit)
        .await
        .map_err(|e| match e {
            SubmissionError::NotFound => AppError::NotFound("cafe".to_string()),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

/// Edit a visit owned by the caller.
///
/// PUT /api/visits/{id}
///
/// # Errors
///
/// Returns 400 with per-field errors, 403 for another user's visit and 404
/// for a missing one.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<VisitId>,
    multipart: Multipart,
) -> Result<Json<SubmissionReceipt>> {
    let raw = read_submission(multipart, state.config().max_upload_bytes).await?;
    let visit = validate_submission(Mode::Update, raw)?;

    let receipt = update_visit(state.pool(), state.media(), user.id, id, visit).await?;
    Ok(Json(receipt))
}

/// A visit with photos, favorite items and stickers.
///
/// GET /api/visits/{id}
///
/// # Errors
///
/// Returns 403 for another user's visit and 404 for a missing one.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<VisitId>,
) -> Result<Json<VisitDetail>> {
    let detail = VisitRepository::new(state.pool())
        .detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("visit".to_string()))?;

    if detail.visit.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only view your own visits".to_string(),
        ));
    }
    Ok(Json(detail))
}

/// Delete a visit and everything attached to it.
///
/// DELETE /api/visits/{id}
///
/// # Errors
///
/// Returns 403 for another user's visit and 404 for a missing one.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<VisitId>,
) -> Result<Json<serde_json::Value>> {
    match VisitRepository::new(state.pool()).delete(id, user.id).await? {
        DeleteOutcome::NotFound => Err(AppError::NotFound("visit".to_string())),
        DeleteOutcome::Forbidden => Err(AppError::Forbidden(
            "You can only delete your own visits".to_string(),
        )),
        DeleteOutcome::Deleted { images } => {
            state.media().remove_all(&images).await;
            tracing::info!(visit_id = %id, user_id = %user.id, "visit deleted");
            Ok(Json(json!({ "status": "success" })))
        }
    }
}

/// A favorite item with its photos and stickers.
///
/// GET /api/favorite-items/{id}
///
/// # Errors
///
/// Returns 403 for another user's item and 404 for a missing one.
pub async fn show_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<FavoriteItemId>,
) -> Result<Json<FavoriteItemDetail>> {
    let (owner, detail) = VisitRepository::new(state.pool())
        .item_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("favorite item".to_string()))?;

    if owner != user.id {
        return Err(AppError::Forbidden(
            "You can only view your own favorite items".to_string(),
        ));
    }
    Ok(Json(detail))
}
