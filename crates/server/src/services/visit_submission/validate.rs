//! Pure validation of a visit submission.
//!
//! Turns a [`RawSubmission`] into a [`ValidatedVisit`] graph or a set of
//! [`FieldErrors`]. Nothing here touches the database or the filesystem;
//! checks that need stored state (ownership, existing IDs, post-update
//! counts) run inside the persistence transaction.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;

use cafe_passport_core::{FavoriteItemId, FieldErrors, ItemPhotoId, Money, Rating, VisitPhotoId};

use super::payload::{ItemInput, PhotoInput, RawSubmission, VisitPayload};
use crate::services::media::{ValidImage, sniff_image};

pub const MAX_VISIT_PHOTOS: usize = 5;
pub const MAX_FAVORITE_ITEMS: usize = 3;
pub const MAX_ITEM_PHOTOS: usize = 2;

const MAX_ITEM_NAME_CHARS: usize = 255;
const MAX_CAPTION_CHARS: usize = 255;

const REQUIRED: &str = "This field is required.";

/// Whether the submission creates a visit or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitFields {
    pub date_visited: NaiveDate,
    pub rating: Rating,
    pub amount_spent: Money,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub name: String,
    pub price: Money,
    pub rating: Rating,
    pub description: String,
}

/// A photo to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub image: ValidImage,
    pub caption: String,
}

/// What happens to one favorite item row.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    Create {
        index: usize,
        fields: ItemFields,
        photos: Vec<NewPhoto>,
    },
    Update {
        index: usize,
        id: FavoriteItemId,
        fields: ItemFields,
        photos: Vec<NewPhoto>,
        remove_photo_ids: Vec<ItemPhotoId>,
    },
    Delete {
        index: usize,
        id: FavoriteItemId,
    },
}

impl ItemChange {
    /// Position of the row in the submitted `favorite_items` array.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Create { index, .. } | Self::Update { index, .. } | Self::Delete { index, .. } => {
                *index
            }
        }
    }

    /// The existing item this row refers to, if any.
    #[must_use]
    pub const fn existing_id(&self) -> Option<FavoriteItemId> {
        match self {
            Self::Create { .. } => None,
            Self::Update { id, .. } | Self::Delete { id, .. } => Some(*id),
        }
    }
}

/// A fully validated submission, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedVisit {
    pub fields: VisitFields,
    pub photos: Vec<NewPhoto>,
    pub remove_photo_ids: Vec<VisitPhotoId>,
    pub items: Vec<ItemChange>,
}

/// Error path of a favorite item row, e.g. `favorite_items[1]`.
#[must_use]
pub fn item_path(index: usize) -> String {
    format!("favorite_items[{index}]")
}

/// Hands out uploaded files, each at most once.
struct FilePool {
    files: std::collections::HashMap<String, super::payload::UploadedFile>,
    used: HashSet<String>,
}

impl FilePool {
    fn take(&mut self, photo: &PhotoInput, path: &str, errors: &mut FieldErrors) -> Option<NewPhoto> {
        let image_path = format!("{path}.image");
        let caption = photo.caption.trim().to_string();
        if caption.chars().count() > MAX_CAPTION_CHARS {
            errors.add(
                format!("{path}.caption"),
                format!("must be at most {MAX_CAPTION_CHARS} characters"),
            );
        }

        let Some(key) = photo.file_key.as_deref().filter(|k| !k.is_empty()) else {
            errors.add(image_path, "No file was submitted.");
            return None;
        };
        if !self.used.insert(key.to_string()) {
            errors.add(image_path, format!("file '{key}' is used by more than one photo"));
            return None;
        }
        let Some(upload) = self.files.remove(key) else {
            errors.add(image_path, format!("no uploaded file named '{key}'"));
            return None;
        };

        match sniff_image(upload.bytes) {
            Ok(image) => Some(NewPhoto { image, caption }),
            Err(e) => {
                errors.add(image_path, e.to_string());
                None
            }
        }
    }

    fn take_all(
        &mut self,
        photos: &[PhotoInput],
        prefix: &str,
        errors: &mut FieldErrors,
    ) -> Vec<NewPhoto> {
        photos
            .iter()
            .enumerate()
            .filter_map(|(i, photo)| self.take(photo, &format!("{prefix}[{i}]"), errors))
            .collect()
    }
}

/// Decode the JSON payload part.
///
/// # Errors
///
/// Returns a `payload` field error when the part is missing or malformed.
pub fn parse_payload(raw: Option<&str>) -> Result<VisitPayload, FieldErrors> {
    let Some(json) = raw else {
        return Err(FieldErrors::single("payload", REQUIRED));
    };
    serde_json::from_str(json)
        .map_err(|e| FieldErrors::single("payload", format!("invalid submission: {e}")))
}

fn required<T>(value: Option<T>, field: &str, errors: &mut FieldErrors) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

fn check<T, E: std::fmt::Display>(
    result: Result<T, E>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    result.map_err(|e| errors.add(field, e.to_string())).ok()
}

fn validate_visit_fields(payload: &VisitPayload, errors: &mut FieldErrors) -> Option<VisitFields> {
    let date_visited = required(
        payload.date_visited.as_deref().map(str::trim).filter(|d| !d.is_empty()),
        "date_visited",
        errors,
    )
    .and_then(|d| {
        check(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| "Enter a valid date in YYYY-MM-DD format."),
            "date_visited",
            errors,
        )
    });
    let rating = required(payload.rating, "rating", errors)
        .and_then(|r| check(Rating::new(r), "rating", errors));
    let amount_spent = required(payload.amount_spent, "amount_spent", errors)
        .and_then(|a| check(Money::new(a), "amount_spent", errors));

    Some(VisitFields {
        date_visited: date_visited?,
        rating: rating?,
        amount_spent: amount_spent?,
        notes: payload.notes.trim().to_string(),
    })
}

fn validate_item_fields(item: &ItemInput, path: &str, errors: &mut FieldErrors) -> Option<ItemFields> {
    let name_field = format!("{path}.name");
    let name = required(
        item.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
        &name_field,
        errors,
    );
    if let Some(n) = name
        && n.chars().count() > MAX_ITEM_NAME_CHARS
    {
        errors.add(
            name_field.as_str(),
            format!("must be at most {MAX_ITEM_NAME_CHARS} characters"),
        );
    }

    let price_field = format!("{path}.price");
    let price = required(item.price, &price_field, errors)
        .and_then(|p| check(Money::new(p), &price_field, errors));

    let rating_field = format!("{path}.rating");
    let rating = required(item.rating, &rating_field, errors)
        .and_then(|r| check(Rating::new(r), &rating_field, errors));

    Some(ItemFields {
        name: name?.to_string(),
        price: price?,
        rating: rating?,
        description: item.description.trim().to_string(),
    })
}

/// Validate a submission.
///
/// Every row is checked and every problem reported; nothing is returned
/// unless the whole graph is valid.
///
/// # Errors
///
/// Returns all field errors found, keyed by path.
pub fn validate_submission(mode: Mode, raw: RawSubmission) -> Result<ValidatedVisit, FieldErrors> {
    let payload = parse_payload(raw.payload.as_deref())?;
    let mut errors = FieldErrors::new();
    let mut files = FilePool {
        files: raw.files,
        used: HashSet::new(),
    };

    let fields = validate_visit_fields(&payload, &mut errors);

    if payload.photos.len() > MAX_VISIT_PHOTOS {
        errors.add(
            "photos",
            format!("Please submit at most {MAX_VISIT_PHOTOS} photos."),
        );
    }
    let photos = files.take_all(&payload.photos, "photos", &mut errors);

    if mode == Mode::Create && !payload.remove_photo_ids.is_empty() {
        errors.add("remove_photo_ids", "There are no photos to remove on a new visit.");
    }
    let remove_photo_ids: Vec<VisitPhotoId> = payload
        .remove_photo_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut items = Vec::new();
    let mut seen_ids = HashSet::new();
    for (index, item) in payload.favorite_items.iter().enumerate() {
        let path = item_path(index);

        if mode == Mode::Create && item.id.is_some() {
            errors.add(
                format!("{path}.id"),
                "A new visit cannot reference an existing item.",
            );
            continue;
        }
        if let Some(id) = item.id
            && !seen_ids.insert(id)
        {
            errors.add(format!("{path}.id"), "This item is listed more than once.");
            continue;
        }

        match (item.id, item.delete) {
            // a blank row marked for deletion is simply dropped
            (None, true) => continue,
            (Some(id), true) => {
                items.push(ItemChange::Delete { index, id });
                continue;
            }
            _ => {}
        }

        if mode == Mode::Create && !item.remove_photo_ids.is_empty() {
            errors.add(
                format!("{path}.remove_photo_ids"),
                "There are no photos to remove on a new item.",
            );
        }
        if item.photos.len() > MAX_ITEM_PHOTOS {
            errors.add(
                format!("{path}.photos"),
                format!("Please submit at most {MAX_ITEM_PHOTOS} photos."),
            );
        }

        let item_fields = validate_item_fields(item, &path, &mut errors);
        let item_photos = files.take_all(&item.photos, &format!("{path}.photos"), &mut errors);

        let Some(item_fields) = item_fields else {
            continue;
        };
        items.push(match item.id {
            Some(id) => ItemChange::Update {
                index,
                id,
                fields: item_fields,
                photos: item_photos,
                remove_photo_ids: item
                    .remove_photo_ids
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            },
            None => ItemChange::Create {
                index,
                fields: item_fields,
                photos: item_photos,
            },
        });
    }

    let kept_items = items
        .iter()
        .filter(|c| !matches!(c, ItemChange::Delete { .. }))
        .count();
    if kept_items > MAX_FAVORITE_ITEMS {
        errors.add(
            "favorite_items",
            format!("Please submit at most {MAX_FAVORITE_ITEMS} favorite items."),
        );
    }

    if !files.files.is_empty() {
        let mut unused: Vec<&String> = files.files.keys().collect();
        unused.sort();
        tracing::debug!(?unused, "ignoring file parts not referenced by the payload");
    }

    match fields {
        Some(fields) if errors.is_empty() => Ok(ValidatedVisit {
            fields,
            photos,
            remove_photo_ids,
            items,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::super::payload::UploadedFile;
    use super::*;
    use crate::services::media::tests::TINY_PNG;

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: Some("photo.png".to_string()),
            bytes: TINY_PNG.to_vec(),
        }
    }

    fn submission(payload: &serde_json::Value, files: &[(&str, UploadedFile)]) -> RawSubmission {
        RawSubmission {
            payload: Some(payload.to_string()),
            files: files
                .iter()
                .map(|(k, f)| ((*k).to_string(), f.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn blue_bottle() -> serde_json::Value {
        json!({
            "date_visited": "2025-01-01",
            "rating": 4,
            "amount_spent": "12.50",
            "photos": [{"file_key": "photo-0", "caption": "counter"}],
            "favorite_items": [{
                "name": "Oat Latte", "price": "5.50", "rating": 4.5,
                "photos": [{"file_key": "item-0-0"}]
            }]
        })
    }

    #[test]
    fn test_valid_graph() {
        let raw = submission(&blue_bottle(), &[("photo-0", png()), ("item-0-0", png())]);
        let visit = validate_submission(Mode::Create, raw).unwrap();

        assert_eq!(visit.fields.date_visited, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(visit.fields.amount_spent.to_string(), "12.50");
        assert_eq!(visit.photos.len(), 1);
        assert_eq!(visit.photos[0].caption, "counter");
        assert_eq!(visit.items.len(), 1);
        match &visit.items[0] {
            ItemChange::Create { fields, photos, .. } => {
                assert_eq!(fields.name, "Oat Latte");
                assert_eq!(photos.len(), 1);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn test_missing_payload() {
        let errors = validate_submission(Mode::Create, RawSubmission::default()).unwrap_err();
        assert!(errors.contains("payload"));
    }

    #[test]
    fn test_required_scalars() {
        let raw = submission(&json!({}), &[]);
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("date_visited"));
        assert!(errors.contains("rating"));
        assert!(errors.contains("amount_spent"));
    }

    #[test]
    fn test_bad_scalars() {
        let raw = submission(
            &json!({"date_visited": "01/02/2025", "rating": 6, "amount_spent": "-1"}),
            &[],
        );
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("date_visited"));
        assert!(errors.contains("rating"));
        assert!(errors.contains("amount_spent"));
    }

    #[test]
    fn test_one_bad_image_fails_everything() {
        let bad = UploadedFile {
            file_name: Some("notes.txt".to_string()),
            bytes: b"hello".to_vec(),
        };
        let raw = submission(&blue_bottle(), &[("photo-0", png()), ("item-0-0", bad)]);
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("favorite_items[0].photos[0].image"));
    }

    #[test]
    fn test_missing_file_part() {
        let raw = submission(&blue_bottle(), &[("photo-0", png())]);
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("favorite_items[0].photos[0].image"));
    }

    #[test]
    fn test_file_key_used_twice() {
        let payload = json!({
            "date_visited": "2025-01-01", "rating": 4, "amount_spent": 3,
            "photos": [{"file_key": "a"}, {"file_key": "a"}]
        });
        let raw = submission(&payload, &[("a", png())]);
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("photos[1].image"));
        assert!(!errors.contains("photos[0].image"));
    }

    #[test]
    fn test_item_field_errors_are_indexed() {
        let payload = json!({
            "date_visited": "2025-01-01", "rating": 4, "amount_spent": 3,
            "favorite_items": [
                {"name": "Drip", "price": 3, "rating": 4},
                {"name": "", "price": "1.234", "rating": 9}
            ]
        });
        let errors = validate_submission(Mode::Create, submission(&payload, &[])).unwrap_err();
        assert!(errors.contains("favorite_items[1].name"));
        assert!(errors.contains("favorite_items[1].price"));
        assert!(errors.contains("favorite_items[1].rating"));
        assert!(!errors.contains("favorite_items[0].name"));
    }

    #[test]
    fn test_limits() {
        let photos: Vec<_> = (0..6).map(|i| json!({"file_key": format!("p{i}")})).collect();
        let files: Vec<(String, UploadedFile)> = (0..6).map(|i| (format!("p{i}"), png())).collect();
        let file_refs: Vec<(&str, UploadedFile)> =
            files.iter().map(|(k, f)| (k.as_str(), f.clone())).collect();
        let item = json!({"name": "x", "price": 1, "rating": 1});
        let payload = json!({
            "date_visited": "2025-01-01", "rating": 4, "amount_spent": 3,
            "photos": photos,
            "favorite_items": [item, item, item, item]
        });
        let errors = validate_submission(Mode::Create, submission(&payload, &file_refs)).unwrap_err();
        assert!(errors.contains("photos"));
        assert!(errors.contains("favorite_items"));
    }

    #[test]
    fn test_item_photo_limit() {
        let payload = json!({
            "date_visited": "2025-01-01", "rating": 4, "amount_spent": 3,
            "favorite_items": [{
                "name": "x", "price": 1, "rating": 1,
                "photos": [{"file_key": "a"}, {"file_key": "b"}, {"file_key": "c"}]
            }]
        });
        let raw = submission(&payload, &[("a", png()), ("b", png()), ("c", png())]);
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("favorite_items[0].photos"));
    }

    #[test]
    fn test_create_rejects_update_only_fields() {
        let payload = json!({
            "date_visited": "2025-01-01", "rating": 4, "amount_spent": 3,
            "remove_photo_ids": [1],
            "favorite_items": [{"id": 4, "name": "x", "price": 1, "rating": 1}]
        });
        let errors = validate_submission(Mode::Create, submission(&payload, &[])).unwrap_err();
        assert!(errors.contains("remove_photo_ids"));
        assert!(errors.contains("favorite_items[0].id"));
    }

    #[test]
    fn test_update_changes() {
        let payload = json!({
            "date_visited": "2025-01-02", "rating": 3.5, "amount_spent": "8",
            "remove_photo_ids": [7, 7, 3],
            "favorite_items": [
                {"id": 1, "delete": true},
                {"id": 2, "name": "Cortado", "price": 4, "rating": 5, "remove_photo_ids": [9]},
                {"name": "Scone", "price": 3, "rating": 4},
                {"delete": true}
            ]
        });
        let visit = validate_submission(Mode::Update, submission(&payload, &[])).unwrap();
        assert_eq!(
            visit.remove_photo_ids,
            vec![VisitPhotoId::new(3), VisitPhotoId::new(7)]
        );
        assert_eq!(visit.items.len(), 3);
        assert!(matches!(visit.items[0], ItemChange::Delete { index: 0, .. }));
        match &visit.items[1] {
            ItemChange::Update { id, remove_photo_ids, .. } => {
                assert_eq!(*id, FavoriteItemId::new(2));
                assert_eq!(remove_photo_ids, &vec![ItemPhotoId::new(9)]);
            }
            other => panic!("unexpected change {other:?}"),
        }
        assert!(matches!(visit.items[2], ItemChange::Create { index: 2, .. }));
    }

    #[test]
    fn test_update_rejects_duplicate_item_ids() {
        let payload = json!({
            "date_visited": "2025-01-02", "rating": 3, "amount_spent": 1,
            "favorite_items": [
                {"id": 2, "name": "a", "price": 1, "rating": 1},
                {"id": 2, "delete": true}
            ]
        });
        let errors = validate_submission(Mode::Update, submission(&payload, &[])).unwrap_err();
        assert!(errors.contains("favorite_items[1].id"));
    }

    #[test]
    fn test_malformed_json() {
        let raw = RawSubmission {
            payload: Some("{not json".to_string()),
            files: HashMap::new(),
        };
        let errors = validate_submission(Mode::Create, raw).unwrap_err();
        assert!(errors.contains("payload"));
    }
}
