//! Wire format of a visit submission.
//!
//! Scalar fields are deliberately loose (`Option`, raw strings) so that
//! missing or malformed values become per-field errors during validation
//! rather than a single deserialization failure.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use cafe_passport_core::{FavoriteItemId, ItemPhotoId, VisitPhotoId};

/// Name of the multipart part carrying the JSON payload.
pub const PAYLOAD_PART: &str = "payload";

/// A photo row referencing an uploaded file part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoInput {
    pub file_key: Option<String>,
    #[serde(default)]
    pub caption: String,
}

/// A favorite item row.
///
/// Without `id` the item is created. With `id` it is updated, or removed
/// when `delete` is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    pub id: Option<FavoriteItemId>,
    #[serde(default)]
    pub delete: bool,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<PhotoInput>,
    #[serde(default)]
    pub remove_photo_ids: Vec<ItemPhotoId>,
}

/// The JSON part of a create or update submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitPayload {
    pub date_visited: Option<String>,
    pub rating: Option<f64>,
    pub amount_spent: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<PhotoInput>,
    #[serde(default)]
    pub favorite_items: Vec<ItemInput>,
    #[serde(default)]
    pub remove_photo_ids: Vec<VisitPhotoId>,
}

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// A parsed multipart submission.
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    /// Contents of the `payload` part, if present.
    pub payload: Option<String>,
    /// File parts keyed by part name.
    pub files: HashMap<String, UploadedFile>,
}
