//! Atomic create/update of a visit with its photos and favorite items.
//!
//! A submission goes through three stages:
//!
//! 1. [`form::read_submission`] reads the multipart body into a
//!    [`RawSubmission`], bounding every file part.
//! 2. [`validate_submission`] checks every row without I/O and produces a
//!    [`ValidatedVisit`] or field errors keyed by path
//!    (`photos[0].image`, `favorite_items[1].rating`, ...).
//! 3. [`create_visit`] / [`update_visit`] apply the graph in one transaction.
//!    Files written during a failed attempt are removed again; files of photos
//!    removed by an update are deleted only once the transaction committed.

pub mod form;
pub mod payload;
pub mod persist;
pub mod validate;

use serde::Serialize;
use thiserror::Error;

use cafe_passport_core::{FavoriteItemId, FieldErrors, ItemPhotoId, VisitId, VisitPhotoId};

use crate::db::RepositoryError;
use crate::services::media::MediaError;

pub use payload::{PAYLOAD_PART, RawSubmission, UploadedFile, VisitPayload};
pub use persist::{create_visit, update_visit};
pub use validate::{
    ItemChange, ItemFields, MAX_FAVORITE_ITEMS, MAX_ITEM_PHOTOS, MAX_VISIT_PHOTOS, Mode, NewPhoto,
    ValidatedVisit, VisitFields, item_path, validate_submission,
};

/// Errors from a visit submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// One or more rows failed validation. Nothing was written.
    #[error("{0}")]
    Invalid(FieldErrors),

    /// The multipart body could not be read.
    #[error("malformed multipart body: {0}")]
    Malformed(String),

    /// The visit or cafe does not exist.
    #[error("not found")]
    NotFound,

    /// The visit belongs to another user.
    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl From<FieldErrors> for SubmissionError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

impl From<sqlx::Error> for SubmissionError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Identifiers of a favorite item touched by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReceipt {
    pub id: FavoriteItemId,
    /// Photos added to the item by this submission.
    pub item_photo_ids: Vec<ItemPhotoId>,
}

/// What a successful submission persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub visit_id: VisitId,
    /// Photos added to the visit by this submission.
    pub visit_photo_ids: Vec<VisitPhotoId>,
    /// Items created or updated, in submission order.
    pub favorite_items: Vec<ItemReceipt>,
    pub deleted_item_ids: Vec<FavoriteItemId>,
}
