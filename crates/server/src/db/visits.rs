//! Visit graph repository.
//!
//! Read operations go through [`VisitRepository`]. The free functions take a
//! `PgConnection` so the submission workflow can compose them inside a single
//! transaction.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use cafe_passport_core::{
    CafeId, FavoriteItemId, ItemPhotoId, Money, PhotoRef, Rating, UserId, VisitId, VisitPhotoId,
};

use super::RepositoryError;
use super::stickers::{stickers_for_item_photos, stickers_for_visit_photos};
use crate::models::visit::cover_image;
use crate::models::{
    FavoriteItem, FavoriteItemDetail, ItemPhoto, PhotoView, Visit, VisitDetail, VisitPhoto,
    VisitSummary,
};
use crate::services::visit_submission::{ItemFields, VisitFields};

#[derive(sqlx::FromRow)]
struct VisitSummaryRow {
    id: VisitId,
    cafe_id: CafeId,
    cafe_name: String,
    date_visited: NaiveDate,
    rating: Rating,
    amount_spent: Money,
    visit_photo: Option<String>,
    item_photo: Option<String>,
    cafe_image: Option<String>,
}

impl From<VisitSummaryRow> for VisitSummary {
    fn from(row: VisitSummaryRow) -> Self {
        Self {
            cover_image: cover_image(
                row.visit_photo.as_deref(),
                row.item_photo.as_deref(),
                row.cafe_image.as_deref(),
            ),
            id: row.id,
            cafe_id: row.cafe_id,
            cafe_name: row.cafe_name,
            date_visited: row.date_visited,
            rating: row.rating,
            amount_spent: row.amount_spent,
        }
    }
}

/// `$1` is the user, `$2` an optional cafe restriction.
const SUMMARY_QUERY: &str = r"
    SELECT v.id, v.cafe_id, c.name AS cafe_name, v.date_visited, v.rating, v.amount_spent,
           (SELECT vp.image FROM passport.visit_photo vp
            WHERE vp.visit_id = v.id
            ORDER BY vp.id LIMIT 1) AS visit_photo,
           (SELECT ip.image FROM passport.favorite_item fi
            JOIN passport.item_photo ip ON ip.item_id = fi.id
            WHERE fi.visit_id = v.id
            ORDER BY fi.id, ip.id LIMIT 1) AS item_photo,
           c.image_url AS cafe_image
    FROM passport.visit v
    JOIN passport.cafe c ON c.id = v.cafe_id
    WHERE v.user_id = $1 AND ($2::int4 IS NULL OR v.cafe_id = $2)
    ORDER BY v.date_visited DESC, v.id DESC
";

/// Repository for reading and deleting visits.
pub struct VisitRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitRepository<'a> {
    /// Create a new visit repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's visits, newest first, with cover images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summaries(
        &self,
        user_id: UserId,
        cafe_id: Option<CafeId>,
    ) -> Result<Vec<VisitSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, VisitSummaryRow>(SUMMARY_QUERY)
            .bind(user_id)
            .bind(cafe_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Owner of a visit, `None` if the visit does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner(&self, id: VisitId) -> Result<Option<UserId>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM passport.visit WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(owner)
    }

    /// A visit with photos, favorite items, item photos and stickers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, id: VisitId) -> Result<Option<VisitDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let Some(visit) = sqlx::query_as::<_, Visit>(
            r"
            SELECT id, user_id, cafe_id, date_visited, rating, amount_spent, notes, created_at
            FROM passport.visit
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let cafe_name = sqlx::query_scalar::<_, String>("SELECT name FROM passport.cafe WHERE id = $1")
            .bind(visit.cafe_id)
            .fetch_one(&mut *conn)
            .await?;

        let photos = sqlx::query_as::<_, VisitPhoto>(
            r"
            SELECT id, visit_id, image, caption, uploaded_at
            FROM passport.visit_photo
            WHERE visit_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let items = sqlx::query_as::<_, FavoriteItem>(
            r"
            SELECT id, visit_id, name, price, rating, description
            FROM passport.favorite_item
            WHERE visit_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let photo_ids: Vec<VisitPhotoId> = photos.iter().map(|p| p.id).collect();
        let mut visit_stickers = group_by(
            stickers_for_visit_photos(&mut conn, &photo_ids).await?,
            |s| match s.photo {
                PhotoRef::Visit(id) => Some(id),
                PhotoRef::Item(_) => None,
            },
        );
        let photos = photos
            .iter()
            .map(|p| PhotoView::from_visit_photo(p, visit_stickers.remove(&p.id).unwrap_or_default()))
            .collect();

        let favorite_items = load_item_details(&mut conn, items).await?;

        Ok(Some(VisitDetail {
            visit,
            cafe_name,
            photos,
            favorite_items,
        }))
    }

    /// A favorite item with its photos and their stickers, plus the owner of
    /// the visit it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn item_detail(
        &self,
        id: FavoriteItemId,
    ) -> Result<Option<(UserId, FavoriteItemDetail)>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let Some(owner) = sqlx::query_scalar::<_, UserId>(
            r"
            SELECT v.user_id
            FROM passport.favorite_item fi
            JOIN passport.visit v ON v.id = fi.visit_id
            WHERE fi.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, FavoriteItem>(
            r"
            SELECT id, visit_id, name, price, rating, description
            FROM passport.favorite_item
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let detail = load_item_details(&mut conn, items).await?.pop();
        Ok(detail.map(|d| (owner, d)))
    }

    /// Delete a visit owned by `user_id`.
    ///
    /// On success the outcome carries the media paths of every photo that
    /// went with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete(
        &self,
        id: VisitId,
        user_id: UserId,
    ) -> Result<DeleteOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        match lock_visit_owner(&mut tx, id).await? {
            None => return Ok(DeleteOutcome::NotFound),
            Some(owner) if owner != user_id => return Ok(DeleteOutcome::Forbidden),
            Some(_) => {}
        }

        let images = images_of_visit(&mut tx, id).await?;

        sqlx::query("DELETE FROM passport.visit WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted { images })
    }
}

/// Result of [`VisitRepository::delete`].
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { images: Vec<String> },
    NotFound,
    Forbidden,
}

fn group_by<K, V>(values: Vec<V>, key: impl Fn(&V) -> Option<K>) -> HashMap<K, Vec<V>>
where
    K: std::hash::Hash + Eq,
{
    let mut map: HashMap<K, Vec<V>> = HashMap::new();
    for v in values {
        if let Some(k) = key(&v) {
            map.entry(k).or_default().push(v);
        }
    }
    map
}

async fn load_item_details(
    conn: &mut PgConnection,
    items: Vec<FavoriteItem>,
) -> Result<Vec<FavoriteItemDetail>, RepositoryError> {
    let item_ids: Vec<FavoriteItemId> = items.iter().map(|i| i.id).collect();
    let photos = sqlx::query_as::<_, ItemPhoto>(
        r"
        SELECT id, item_id, image, caption, uploaded_at
        FROM passport.item_photo
        WHERE item_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&item_ids)
    .fetch_all(&mut *conn)
    .await?;

    let photo_ids: Vec<ItemPhotoId> = photos.iter().map(|p| p.id).collect();
    let mut stickers = group_by(stickers_for_item_photos(conn, &photo_ids).await?, |s| {
        match s.photo {
            PhotoRef::Item(id) => Some(id),
            PhotoRef::Visit(_) => None,
        }
    });
    let mut photos_by_item = group_by(photos, |p| Some(p.item_id));

    Ok(items
        .into_iter()
        .map(|item| {
            let photos = photos_by_item
                .remove(&item.id)
                .unwrap_or_default()
                .iter()
                .map(|p| PhotoView::from_item_photo(p, stickers.remove(&p.id).unwrap_or_default()))
                .collect();
            FavoriteItemDetail { item, photos }
        })
        .collect())
}

// =============================================================================
// Transaction building blocks
// =============================================================================

/// Lock a visit row and return its owner.
pub(crate) async fn lock_visit_owner(
    conn: &mut PgConnection,
    id: VisitId,
) -> Result<Option<UserId>, RepositoryError> {
    let owner = sqlx::query_scalar::<_, UserId>(
        "SELECT user_id FROM passport.visit WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(owner)
}

pub(crate) async fn cafe_exists(
    conn: &mut PgConnection,
    id: CafeId,
) -> Result<bool, RepositoryError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM passport.cafe WHERE id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

pub(crate) async fn insert_visit(
    conn: &mut PgConnection,
    user_id: UserId,
    cafe_id: CafeId,
    fields: &VisitFields,
) -> Result<VisitId, RepositoryError> {
    let id = sqlx::query_scalar::<_, VisitId>(
        r"
        INSERT INTO passport.visit (user_id, cafe_id, date_visited, rating, amount_spent, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(cafe_id)
    .bind(fields.date_visited)
    .bind(fields.rating)
    .bind(fields.amount_spent)
    .bind(&fields.notes)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn update_visit(
    conn: &mut PgConnection,
    id: VisitId,
    fields: &VisitFields,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE passport.visit
        SET date_visited = $2, rating = $3, amount_spent = $4, notes = $5
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(fields.date_visited)
    .bind(fields.rating)
    .bind(fields.amount_spent)
    .bind(&fields.notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// `(id, image path)` of every photo on a visit.
pub(crate) async fn visit_photos_of(
    conn: &mut PgConnection,
    visit_id: VisitId,
) -> Result<Vec<(VisitPhotoId, String)>, RepositoryError> {
    let rows = sqlx::query_as::<_, (VisitPhotoId, String)>(
        "SELECT id, image FROM passport.visit_photo WHERE visit_id = $1 ORDER BY id",
    )
    .bind(visit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub(crate) async fn insert_visit_photo(
    conn: &mut PgConnection,
    visit_id: VisitId,
    image: &str,
    caption: &str,
) -> Result<VisitPhotoId, RepositoryError> {
    let id = sqlx::query_scalar::<_, VisitPhotoId>(
        r"
        INSERT INTO passport.visit_photo (visit_id, image, caption)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(visit_id)
    .bind(image)
    .bind(caption)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn delete_visit_photos(
    conn: &mut PgConnection,
    ids: &[VisitPhotoId],
) -> Result<(), RepositoryError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM passport.visit_photo WHERE id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// IDs of the favorite items on a visit.
pub(crate) async fn items_of(
    conn: &mut PgConnection,
    visit_id: VisitId,
) -> Result<Vec<FavoriteItemId>, RepositoryError> {
    let ids = sqlx::query_scalar::<_, FavoriteItemId>(
        "SELECT id FROM passport.favorite_item WHERE visit_id = $1 ORDER BY id",
    )
    .bind(visit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

pub(crate) async fn insert_item(
    conn: &mut PgConnection,
    visit_id: VisitId,
    fields: &ItemFields,
) -> Result<FavoriteItemId, RepositoryError> {
    let id = sqlx::query_scalar::<_, FavoriteItemId>(
        r"
        INSERT INTO passport.favorite_item (visit_id, name, price, rating, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(visit_id)
    .bind(&fields.name)
    .bind(fields.price)
    .bind(fields.rating)
    .bind(&fields.description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn update_item(
    conn: &mut PgConnection,
    id: FavoriteItemId,
    fields: &ItemFields,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE passport.favorite_item
        SET name = $2, price = $3, rating = $4, description = $5
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(&fields.name)
    .bind(fields.price)
    .bind(fields.rating)
    .bind(&fields.description)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_items(
    conn: &mut PgConnection,
    ids: &[FavoriteItemId],
) -> Result<(), RepositoryError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM passport.favorite_item WHERE id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// `(id, item id, image path)` of every photo on the given items.
pub(crate) async fn item_photos_of(
    conn: &mut PgConnection,
    item_ids: &[FavoriteItemId],
) -> Result<Vec<(ItemPhotoId, FavoriteItemId, String)>, RepositoryError> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, (ItemPhotoId, FavoriteItemId, String)>(
        "SELECT id, item_id, image FROM passport.item_photo WHERE item_id = ANY($1) ORDER BY id",
    )
    .bind(item_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub(crate) async fn insert_item_photo(
    conn: &mut PgConnection,
    item_id: FavoriteItemId,
    image: &str,
    caption: &str,
) -> Result<ItemPhotoId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ItemPhotoId>(
        r"
        INSERT INTO passport.item_photo (item_id, image, caption)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(item_id)
    .bind(image)
    .bind(caption)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn delete_item_photos(
    conn: &mut PgConnection,
    ids: &[ItemPhotoId],
) -> Result<(), RepositoryError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM passport.item_photo WHERE id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Media paths of every visit photo and item photo under a visit.
pub(crate) async fn images_of_visit(
    conn: &mut PgConnection,
    visit_id: VisitId,
) -> Result<Vec<String>, RepositoryError> {
    let images = sqlx::query_scalar::<_, String>(
        r"
        SELECT image FROM passport.visit_photo WHERE visit_id = $1
        UNION ALL
        SELECT ip.image
        FROM passport.item_photo ip
        JOIN passport.favorite_item fi ON fi.id = ip.item_id
        WHERE fi.visit_id = $1
        ",
    )
    .bind(visit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(images)
}
