//! Transactional write of a validated visit graph.

use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use cafe_passport_core::{
    CafeId, FavoriteItemId, FieldErrors, ItemPhotoId, UserId, VisitId, VisitPhotoId,
};

use super::validate::{
    ItemChange, MAX_FAVORITE_ITEMS, MAX_ITEM_PHOTOS, MAX_VISIT_PHOTOS, NewPhoto, ValidatedVisit,
    item_path,
};
use super::{ItemReceipt, SubmissionError, SubmissionReceipt};
use crate::db::visits;
use crate::services::media::{MediaKind, MediaStore};

/// Outcome of the in-transaction work, before commit.
struct Applied {
    receipt: SubmissionReceipt,
    /// Stored images whose rows were deleted. Removed after commit.
    orphaned: Vec<String>,
}

/// Create a visit at `cafe_id` for `user_id`.
///
/// # Errors
///
/// Returns `SubmissionError::NotFound` if the cafe does not exist, or a
/// repository/media error if the write fails. On error nothing is persisted.
pub async fn create_visit(
    pool: &PgPool,
    media: &MediaStore,
    user_id: UserId,
    cafe_id: CafeId,
    visit: ValidatedVisit,
) -> Result<SubmissionReceipt, SubmissionError> {
    let mut tx = pool.begin().await?;
    let mut written = Vec::new();
    let result = apply_create(&mut tx, media, &mut written, user_id, cafe_id, visit).await;
    finish(tx, media, written, result).await
}

/// Apply an edit to an existing visit owned by `user_id`.
///
/// # Errors
///
/// Returns `SubmissionError::NotFound` for a missing visit,
/// `SubmissionError::Forbidden` if it belongs to someone else and
/// `SubmissionError::Invalid` when referenced items or photos are unknown or
/// the edit would exceed a count limit. On error nothing is persisted.
pub async fn update_visit(
    pool: &PgPool,
    media: &MediaStore,
    user_id: UserId,
    visit_id: VisitId,
    visit: ValidatedVisit,
) -> Result<SubmissionReceipt, SubmissionError> {
    let mut tx = pool.begin().await?;
    let mut written = Vec::new();
    let result = apply_update(&mut tx, media, &mut written, user_id, visit_id, visit).await;
    finish(tx, media, written, result).await
}

async fn finish(
    tx: Transaction<'static, Postgres>,
    media: &MediaStore,
    written: Vec<String>,
    result: Result<Applied, SubmissionError>,
) -> Result<SubmissionReceipt, SubmissionError> {
    let applied = match result {
        Ok(applied) => applied,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            media.remove_all(&written).await;
            return Err(e);
        }
    };

    if let Err(e) = tx.commit().await {
        tracing::error!(error = %e, "visit submission commit failed");
        media.remove_all(&written).await;
        return Err(e.into());
    }

    media.remove_all(&applied.orphaned).await;
    tracing::info!(
        visit_id = %applied.receipt.visit_id,
        photos = applied.receipt.visit_photo_ids.len(),
        items = applied.receipt.favorite_items.len(),
        "visit saved"
    );
    Ok(applied.receipt)
}

async fn apply_create(
    conn: &mut PgConnection,
    media: &MediaStore,
    written: &mut Vec<String>,
    user_id: UserId,
    cafe_id: CafeId,
    visit: ValidatedVisit,
) -> Result<Applied, SubmissionError> {
    if !visits::cafe_exists(conn, cafe_id).await? {
        return Err(SubmissionError::NotFound);
    }

    let visit_id = visits::insert_visit(conn, user_id, cafe_id, &visit.fields).await?;
    let visit_photo_ids = store_visit_photos(conn, media, written, visit_id, &visit.photos).await?;

    let mut favorite_items = Vec::with_capacity(visit.items.len());
    for change in &visit.items {
        if let ItemChange::Create { fields, photos, .. } = change {
            let id = visits::insert_item(conn, visit_id, fields).await?;
            let item_photo_ids = store_item_photos(conn, media, written, id, photos).await?;
            favorite_items.push(ItemReceipt { id, item_photo_ids });
        }
    }

    Ok(Applied {
        receipt: SubmissionReceipt {
            visit_id,
            visit_photo_ids,
            favorite_items,
            deleted_item_ids: Vec::new(),
        },
        orphaned: Vec::new(),
    })
}

async fn apply_update(
    conn: &mut PgConnection,
    media: &MediaStore,
    written: &mut Vec<String>,
    user_id: UserId,
    visit_id: VisitId,
    visit: ValidatedVisit,
) -> Result<Applied, SubmissionError> {
    match visits::lock_visit_owner(conn, visit_id).await? {
        None => return Err(SubmissionError::NotFound),
        Some(owner) if owner != user_id => return Err(SubmissionError::Forbidden),
        Some(_) => {}
    }

    let visit_photos: HashMap<_, _> = visits::visit_photos_of(conn, visit_id)
        .await?
        .into_iter()
        .collect();
    let item_ids: Vec<FavoriteItemId> = visits::items_of(conn, visit_id).await?;
    let mut item_photos: HashMap<FavoriteItemId, Vec<(ItemPhotoId, String)>> = HashMap::new();
    for (photo_id, item_id, image) in visits::item_photos_of(conn, &item_ids).await? {
        item_photos.entry(item_id).or_default().push((photo_id, image));
    }

    check_against_stored(&visit, &visit_photos, &item_ids, &item_photos)?;

    visits::update_visit(conn, visit_id, &visit.fields).await?;

    let mut orphaned: Vec<String> = visit
        .remove_photo_ids
        .iter()
        .filter_map(|id| visit_photos.get(id).cloned())
        .collect();
    visits::delete_visit_photos(conn, &visit.remove_photo_ids).await?;
    let visit_photo_ids = store_visit_photos(conn, media, written, visit_id, &visit.photos).await?;

    let mut favorite_items = Vec::new();
    let mut deleted_item_ids = Vec::new();
    for change in &visit.items {
        match change {
            ItemChange::Create { fields, photos, .. } => {
                let id = visits::insert_item(conn, visit_id, fields).await?;
                let item_photo_ids = store_item_photos(conn, media, written, id, photos).await?;
                favorite_items.push(ItemReceipt { id, item_photo_ids });
            }
            ItemChange::Update {
                id,
                fields,
                photos,
                remove_photo_ids,
                ..
            } => {
                visits::update_item(conn, *id, fields).await?;
                let removing: HashSet<_> = remove_photo_ids.iter().collect();
                orphaned.extend(
                    item_photos
                        .get(id)
                        .into_iter()
                        .flatten()
                        .filter(|(photo_id, _)| removing.contains(photo_id))
                        .map(|(_, image)| image.clone()),
                );
                visits::delete_item_photos(conn, remove_photo_ids).await?;
                let item_photo_ids = store_item_photos(conn, media, written, *id, photos).await?;
                favorite_items.push(ItemReceipt {
                    id: *id,
                    item_photo_ids,
                });
            }
            ItemChange::Delete { id, .. } => {
                orphaned.extend(
                    item_photos
                        .get(id)
                        .into_iter()
                        .flatten()
                        .map(|(_, image)| image.clone()),
                );
                deleted_item_ids.push(*id);
            }
        }
    }
    visits::delete_items(conn, &deleted_item_ids).await?;

    Ok(Applied {
        receipt: SubmissionReceipt {
            visit_id,
            visit_photo_ids,
            favorite_items,
            deleted_item_ids,
        },
        orphaned,
    })
}

/// Checks that need the stored graph: referenced IDs belong to this visit and
/// the result stays within the count limits.
fn check_against_stored(
    visit: &ValidatedVisit,
    visit_photos: &HashMap<VisitPhotoId, String>,
    item_ids: &[FavoriteItemId],
    item_photos: &HashMap<FavoriteItemId, Vec<(ItemPhotoId, String)>>,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for id in &visit.remove_photo_ids {
        if !visit_photos.contains_key(id) {
            errors.add("remove_photo_ids", format!("Photo {id} is not part of this visit."));
        }
    }
    let photo_total =
        (visit_photos.len() + visit.photos.len()).saturating_sub(visit.remove_photo_ids.len());
    if errors.is_empty() && photo_total > MAX_VISIT_PHOTOS {
        errors.add(
            "photos",
            format!("A visit can have at most {MAX_VISIT_PHOTOS} photos."),
        );
    }

    let mut item_total = item_ids.len();
    for change in &visit.items {
        let path = item_path(change.index());
        if let Some(id) = change.existing_id()
            && !item_ids.contains(&id)
        {
            errors.add(format!("{path}.id"), format!("Item {id} is not part of this visit."));
            continue;
        }
        match change {
            ItemChange::Create { .. } => item_total += 1,
            ItemChange::Delete { .. } => item_total = item_total.saturating_sub(1),
            ItemChange::Update {
                id,
                photos,
                remove_photo_ids,
                ..
            } => {
                let existing = item_photos.get(id).map_or(&[][..], Vec::as_slice);
                let mut unknown = false;
                for photo_id in remove_photo_ids {
                    if !existing.iter().any(|(p, _)| p == photo_id) {
                        unknown = true;
                        errors.add(
                            format!("{path}.remove_photo_ids"),
                            format!("Photo {photo_id} is not part of this item."),
                        );
                    }
                }
                let total = existing.len() + photos.len();
                if !unknown && total.saturating_sub(remove_photo_ids.len()) > MAX_ITEM_PHOTOS {
                    errors.add(
                        format!("{path}.photos"),
                        format!("An item can have at most {MAX_ITEM_PHOTOS} photos."),
                    );
                }
            }
        }
    }
    if item_total > MAX_FAVORITE_ITEMS {
        errors.add(
            "favorite_items",
            format!("A visit can have at most {MAX_FAVORITE_ITEMS} favorite items."),
        );
    }

    errors.into_result(())
}

async fn store_visit_photos(
    conn: &mut PgConnection,
    media: &MediaStore,
    written: &mut Vec<String>,
    visit_id: VisitId,
    photos: &[NewPhoto],
) -> Result<Vec<VisitPhotoId>, SubmissionError> {
    let mut ids = Vec::with_capacity(photos.len());
    for photo in photos {
        let path = media.save(MediaKind::VisitPhoto, &photo.image).await?;
        written.push(path.clone());
        ids.push(visits::insert_visit_photo(conn, visit_id, &path, &photo.caption).await?);
    }
    Ok(ids)
}

async fn store_item_photos(
    conn: &mut PgConnection,
    media: &MediaStore,
    written: &mut Vec<String>,
    item_id: FavoriteItemId,
    photos: &[NewPhoto],
) -> Result<Vec<ItemPhotoId>, SubmissionError> {
    let mut ids = Vec::with_capacity(photos.len());
    for photo in photos {
        let path = media.save(MediaKind::ItemPhoto, &photo.image).await?;
        written.push(path.clone());
        ids.push(visits::insert_item_photo(conn, item_id, &path, &photo.caption).await?);
    }
    Ok(ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::visit_submission::validate::{ItemFields, VisitFields};
    use cafe_passport_core::{Money, Rating};

    fn fields() -> VisitFields {
        VisitFields {
            date_visited: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            rating: Rating::new(4.0).unwrap(),
            amount_spent: Money::zero(),
            notes: String::new(),
        }
    }

    fn item_fields() -> ItemFields {
        ItemFields {
            name: "Oat Latte".to_string(),
            price: Money::zero(),
            rating: Rating::new(4.5).unwrap(),
            description: String::new(),
        }
    }

    fn edit(items: Vec<ItemChange>, remove: Vec<VisitPhotoId>) -> ValidatedVisit {
        ValidatedVisit {
            fields: fields(),
            photos: Vec::new(),
            remove_photo_ids: remove,
            items,
        }
    }

    fn photos(ids: &[i32]) -> HashMap<VisitPhotoId, String> {
        ids.iter()
            .map(|&i| (VisitPhotoId::new(i), format!("visit_photos/{i}.png")))
            .collect()
    }

    #[test]
    fn test_unknown_photo_rejected() {
        let visit = edit(Vec::new(), vec![VisitPhotoId::new(9)]);
        let errors =
            check_against_stored(&visit, &photos(&[1]), &[], &HashMap::new()).unwrap_err();
        assert!(errors.contains("remove_photo_ids"));
    }

    #[test]
    fn test_unknown_item_rejected() {
        let visit = edit(
            vec![ItemChange::Delete {
                index: 0,
                id: FavoriteItemId::new(42),
            }],
            Vec::new(),
        );
        let errors = check_against_stored(
            &visit,
            &HashMap::new(),
            &[FavoriteItemId::new(1)],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(errors.contains("favorite_items[0].id"));
    }

    #[test]
    fn test_item_limit_counts_stored_items() {
        let stored = [FavoriteItemId::new(1), FavoriteItemId::new(2), FavoriteItemId::new(3)];
        let create = ItemChange::Create {
            index: 0,
            fields: item_fields(),
            photos: Vec::new(),
        };
        let visit = edit(vec![create], Vec::new());
        let errors =
            check_against_stored(&visit, &HashMap::new(), &stored, &HashMap::new()).unwrap_err();
        assert!(errors.contains("favorite_items"));

        // deleting one makes room
        let visit = edit(
            vec![
                ItemChange::Delete {
                    index: 0,
                    id: FavoriteItemId::new(1),
                },
                ItemChange::Create {
                    index: 1,
                    fields: item_fields(),
                    photos: Vec::new(),
                },
            ],
            Vec::new(),
        );
        assert!(check_against_stored(&visit, &HashMap::new(), &stored, &HashMap::new()).is_ok());
    }

    #[test]
    fn test_item_photo_must_belong_to_item() {
        let item = FavoriteItemId::new(1);
        let mut stored_photos = HashMap::new();
        stored_photos.insert(item, vec![(ItemPhotoId::new(10), "item_photos/a.png".to_string())]);
        let visit = edit(
            vec![ItemChange::Update {
                index: 0,
                id: item,
                fields: item_fields(),
                photos: Vec::new(),
                remove_photo_ids: vec![ItemPhotoId::new(11)],
            }],
            Vec::new(),
        );
        let errors =
            check_against_stored(&visit, &HashMap::new(), &[item], &stored_photos).unwrap_err();
        assert!(errors.contains("favorite_items[0].remove_photo_ids"));
    }

    #[test]
    fn test_removing_photos_within_limit() {
        let visit = edit(Vec::new(), vec![VisitPhotoId::new(1), VisitPhotoId::new(2)]);
        assert!(
            check_against_stored(&visit, &photos(&[1, 2, 3, 4, 5]), &[], &HashMap::new()).is_ok()
        );
    }
}
