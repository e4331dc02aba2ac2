//! Sticker placement handlers.
//!
//! Every mutation is scoped to the owner of the visit the photo belongs to.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use cafe_passport_core::{PhotoRef, StickerId, StickerTransform, TransformError, UserId};

use crate::db::StickerRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::StickerType;
use crate::state::AppState;

/// Request to place a new sticker.
#[derive(Debug, Deserialize)]
pub struct PlaceStickerRequest {
    pub photo: PhotoRef,
    /// Name of an entry in the sticker catalog.
    pub sticker_type: String,
    pub x: f64,
    pub y: f64,
}

/// New position, scale and rotation of a sticker.
#[derive(Debug, Deserialize)]
pub struct UpdateStickerRequest {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

fn invalid_transform(e: &TransformError) -> AppError {
    AppError::invalid(e.field(), e.to_string())
}

/// Ownership check shared by every sticker mutation.
fn ensure_owner(owner: Option<UserId>, caller: UserId, what: &str) -> Result<()> {
    match owner {
        None => Err(AppError::NotFound(what.to_string())),
        Some(owner) if owner != caller => Err(AppError::Forbidden(
            "You can only change stickers on your own photos".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

/// The sticker catalog.
///
/// GET /api/sticker-types
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn types(State(state): State<AppState>) -> Result<Json<Vec<StickerType>>> {
    Ok(Json(StickerRepository::new(state.pool()).list_types().await?))
}

/// Place a sticker on one of the caller's photos.
///
/// POST /api/stickers
///
/// # Errors
///
/// Returns 400 for an unknown sticker type or a position outside the photo,
/// 403 for another user's photo and 404 for a missing photo.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlaceStickerRequest>,
) -> Result<Response> {
    let stickers = StickerRepository::new(state.pool());

    ensure_owner(stickers.photo_owner(request.photo).await?, user.id, "photo")?;

    let transform =
        StickerTransform::at(request.x, request.y).map_err(|e| invalid_transform(&e))?;
    let sticker_type = stickers
        .type_by_name(&request.sticker_type)
        .await?
        .ok_or_else(|| {
            AppError::invalid(
                "sticker_type",
                format!("Unknown sticker type '{}'.", request.sticker_type),
            )
        })?;

    let sticker = stickers
        .create(request.photo, sticker_type.id, transform)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "id": sticker.id, "sticker": sticker })),
    )
        .into_response())
}

/// Move, scale or rotate a sticker.
///
/// PUT /api/stickers/{id}
///
/// Responds with the stored values; rotation comes back normalized to
/// `[0, 360)`.
///
/// # Errors
///
/// Returns 400 for an invalid transform, 403 for another user's sticker and
/// 404 for a missing one.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StickerId>,
    Json(request): Json<UpdateStickerRequest>,
) -> Result<Json<serde_json::Value>> {
    let stickers = StickerRepository::new(state.pool());

    ensure_owner(stickers.sticker_owner(id).await?, user.id, "sticker")?;

    let transform = StickerTransform::new(request.x, request.y, request.scale, request.rotation)
        .map_err(|e| invalid_transform(&e))?;
    let sticker = stickers.update_transform(id, transform).await?;

    Ok(Json(json!({ "status": "success", "sticker": sticker })))
}

/// Remove a sticker. The photo is untouched.
///
/// DELETE /api/stickers/{id}
///
/// # Errors
///
/// Returns 403 for another user's sticker and 404 for a missing one.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StickerId>,
) -> Result<Json<serde_json::Value>> {
    let stickers = StickerRepository::new(state.pool());

    ensure_owner(stickers.sticker_owner(id).await?, user.id, "sticker")?;
    stickers.delete(id).await?;
    tracing::info!(sticker_id = %id, user_id = %user.id, "sticker deleted");

    Ok(Json(json!({
        "status": "success",
        "message": format!("Sticker {id} deleted."),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_owner() {
        let me = UserId::new(1);
        assert!(ensure_owner(Some(me), me, "sticker").is_ok());
        assert!(matches!(
            ensure_owner(Some(UserId::new(2)), me, "sticker"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_owner(None, me, "sticker"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_transform_error_names_field() {
        let Err(e) = StickerTransform::new(50.0, 50.0, 0.0, 0.0) else {
            panic!("zero scale accepted");
        };
        let AppError::Validation(errors) = invalid_transform(&e) else {
            panic!("expected validation error");
        };
        assert!(errors.contains("scale"));
    }
}
