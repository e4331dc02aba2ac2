//! Visit, photo and favorite item types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use cafe_passport_core::{
    CafeId, FavoriteItemId, ItemPhotoId, Money, Rating, UserId, VisitId, VisitPhotoId,
};

use super::sticker::Sticker;
use crate::services::media::media_url;

/// Image shown for a visit with no photos at a cafe with no image.
pub const DEFAULT_COVER_IMAGE: &str = "/static/default_cafe.jpg";

/// One logged visit to a cafe.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Visit {
    pub id: VisitId,
    pub user_id: UserId,
    pub cafe_id: CafeId,
    pub date_visited: NaiveDate,
    pub rating: Rating,
    pub amount_spent: Money,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct VisitPhoto {
    pub id: VisitPhotoId,
    pub visit_id: VisitId,
    /// Path under the media root.
    pub image: String,
    pub caption: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A menu item the user singled out during a visit.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FavoriteItem {
    pub id: FavoriteItemId,
    pub visit_id: VisitId,
    pub name: String,
    pub price: Money,
    pub rating: Rating,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ItemPhoto {
    pub id: ItemPhotoId,
    pub item_id: FavoriteItemId,
    /// Path under the media root.
    pub image: String,
    pub caption: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A photo as returned to clients, with the stickers placed on it.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoView<I> {
    pub id: I,
    pub url: String,
    pub caption: String,
    pub stickers: Vec<Sticker>,
}

impl PhotoView<VisitPhotoId> {
    #[must_use]
    pub fn from_visit_photo(photo: &VisitPhoto, stickers: Vec<Sticker>) -> Self {
        Self {
            id: photo.id,
            url: media_url(&photo.image),
            caption: photo.caption.clone(),
            stickers,
        }
    }
}

impl PhotoView<ItemPhotoId> {
    #[must_use]
    pub fn from_item_photo(photo: &ItemPhoto, stickers: Vec<Sticker>) -> Self {
        Self {
            id: photo.id,
            url: media_url(&photo.image),
            caption: photo.caption.clone(),
            stickers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteItemDetail {
    #[serde(flatten)]
    pub item: FavoriteItem,
    pub photos: Vec<PhotoView<ItemPhotoId>>,
}

/// A visit with its full child graph.
#[derive(Debug, Clone, Serialize)]
pub struct VisitDetail {
    #[serde(flatten)]
    pub visit: Visit,
    pub cafe_name: String,
    pub photos: Vec<PhotoView<VisitPhotoId>>,
    pub favorite_items: Vec<FavoriteItemDetail>,
}

/// A visit as listed on the profile and cafe pages.
#[derive(Debug, Clone, Serialize)]
pub struct VisitSummary {
    pub id: VisitId,
    pub cafe_id: CafeId,
    pub cafe_name: String,
    pub date_visited: NaiveDate,
    pub rating: Rating,
    pub amount_spent: Money,
    pub cover_image: String,
}

/// Pick the image that represents a visit.
///
/// The first visit photo wins, then the first favorite item photo, then the
/// cafe's own image. Photo arguments are media paths, the cafe image is
/// already a URL.
#[must_use]
pub fn cover_image(
    visit_photo: Option<&str>,
    item_photo: Option<&str>,
    cafe_image: Option<&str>,
) -> String {
    if let Some(path) = visit_photo {
        return media_url(path);
    }
    if let Some(path) = item_photo {
        return media_url(path);
    }
    match cafe_image {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => DEFAULT_COVER_IMAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_prefers_visit_photo() {
        let cover = cover_image(
            Some("visit_photos/a.jpg"),
            Some("item_photos/b.jpg"),
            Some("https://img.example/c.jpg"),
        );
        assert_eq!(cover, "/media/visit_photos/a.jpg");
    }

    #[test]
    fn test_cover_falls_back_to_item_photo() {
        let cover = cover_image(None, Some("item_photos/b.jpg"), Some("https://img.example/c.jpg"));
        assert_eq!(cover, "/media/item_photos/b.jpg");
    }

    #[test]
    fn test_cover_falls_back_to_cafe_image() {
        let cover = cover_image(None, None, Some("https://img.example/c.jpg"));
        assert_eq!(cover, "https://img.example/c.jpg");
    }

    #[test]
    fn test_cover_default() {
        assert_eq!(cover_image(None, None, None), DEFAULT_COVER_IMAGE);
        assert_eq!(cover_image(None, None, Some("  ")), DEFAULT_COVER_IMAGE);
    }
}
