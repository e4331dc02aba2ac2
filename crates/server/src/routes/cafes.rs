//! Cafe catalog handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use cafe_passport_core::{CafeId, FieldErrors, TagId};

use crate::db::{CafeRepository, VisitRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Cafe, CafeDetail, CafeViewerState, Tag};
use crate::services::catalog::{CafeInput, ValidatedCafe, validate_cafe};
use crate::state::AppState;

/// All cafes by name.
///
/// GET /api/cafes
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Cafe>>> {
    Ok(Json(CafeRepository::new(state.pool()).list().await?))
}

/// All tags by name.
///
/// GET /api/tags
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(CafeRepository::new(state.pool()).list_tags().await?))
}

/// Validate input and check that every referenced tag exists.
async fn validated(state: &AppState, input: CafeInput) -> Result<ValidatedCafe> {
    let cafe = validate_cafe(input)?;

    if !cafe.tag_ids.is_empty() {
        let found = CafeRepository::new(state.pool())
            .tags_by_ids(&cafe.tag_ids)
            .await?;
        let missing: Vec<TagId> = cafe
            .tag_ids
            .iter()
            .copied()
            .filter(|id| !found.iter().any(|t| t.id == *id))
            .collect();
        if !missing.is_empty() {
            let mut errors = FieldErrors::new();
            for id in missing {
                errors.add("tag_ids", format!("Tag {id} does not exist."));
            }
            return Err(errors.into());
        }
    }

    Ok(cafe)
}

/// Add a cafe to the catalog, and by default to the caller's wishlist.
///
/// POST /api/cafes
///
/// # Errors
///
/// Returns 400 for invalid fields.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<CafeInput>,
) -> Result<Response> {
    let cafe = validated(&state, input).await?;
    let wishlist_for = cafe.add_to_wishlist.then_some(user.id);

    let created = CafeRepository::new(state.pool())
        .create(&cafe, wishlist_for)
        .await?;
    tracing::info!(cafe_id = %created.id, user_id = %user.id, "cafe created");

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// A cafe with tags, plus the caller's visits and wishlist status there.
///
/// GET /api/cafes/{id}
///
/// # Errors
///
/// Returns 404 if the cafe does not exist.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<CafeId>,
) -> Result<Json<CafeDetail>> {
    let cafe = CafeRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("cafe".to_string()))?;

    let viewer = match user {
        Some(user) => {
            let visits = VisitRepository::new(state.pool())
                .summaries(user.id, Some(id))
                .await?;
            let wishlist_entry = WishlistRepository::new(state.pool())
                .find(user.id, id)
                .await?;
            Some(CafeViewerState {
                has_visited: !visits.is_empty(),
                wishlist_entry,
                visits,
            })
        }
        None => None,
    };

    Ok(Json(CafeDetail { cafe, viewer }))
}

/// Edit a cafe. Tags are replaced.
///
/// PUT /api/cafes/{id}
///
/// # Errors
///
/// Returns 400 for invalid fields and 404 if the cafe does not exist.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CafeId>,
    Json(input): Json<CafeInput>,
) -> Result<Json<Cafe>> {
    let cafe = validated(&state, input).await?;
    let updated = CafeRepository::new(state.pool()).update(id, &cafe).await?;
    tracing::info!(cafe_id = %id, user_id = %user.id, "cafe updated");

    Ok(Json(updated))
}

/// Remove a cafe and everything logged against it. Staff only.
///
/// DELETE /api/cafes/{id}
///
/// # Errors
///
/// Returns 403 for non-staff callers and 404 if the cafe does not exist.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CafeId>,
) -> Result<Json<serde_json::Value>> {
    if !user.is_staff {
        return Err(AppError::Forbidden(
            "Only staff can delete cafes".to_string(),
        ));
    }

    let images = CafeRepository::new(state.pool()).delete(id).await?;
    state.media().remove_all(&images).await;
    tracing::info!(cafe_id = %id, user_id = %user.id, removed_images = images.len(), "cafe deleted");

    Ok(Json(json!({ "status": "success" })))
}
