//! Sticker types.

use serde::{Deserialize, Serialize};

use cafe_passport_core::{PhotoRef, StickerId, StickerTransform, StickerTypeId};

/// An entry in the sticker catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StickerType {
    pub id: StickerTypeId,
    pub name: String,
    /// URL of the sticker artwork.
    pub image: String,
}

/// A sticker placed on a photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sticker {
    pub id: StickerId,
    pub photo: PhotoRef,
    pub sticker_type: StickerType,
    #[serde(flatten)]
    pub transform: StickerTransform,
}
