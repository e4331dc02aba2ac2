//! Sticker catalog and placement repository.

use sqlx::{PgConnection, PgPool};

use cafe_passport_core::{
    ItemPhotoId, PhotoRef, StickerId, StickerTransform, StickerTypeId, UserId, VisitPhotoId,
};

use super::RepositoryError;
use crate::models::{Sticker, StickerType};

#[derive(sqlx::FromRow)]
struct StickerRow {
    id: StickerId,
    visit_photo_id: Option<VisitPhotoId>,
    item_photo_id: Option<ItemPhotoId>,
    sticker_type_id: StickerTypeId,
    type_name: String,
    type_image: String,
    x: f64,
    y: f64,
    scale: f64,
    rotation: f64,
}

impl TryFrom<StickerRow> for Sticker {
    type Error = RepositoryError;

    fn try_from(row: StickerRow) -> Result<Self, Self::Error> {
        let photo = match (row.visit_photo_id, row.item_photo_id) {
            (Some(id), None) => PhotoRef::Visit(id),
            (None, Some(id)) => PhotoRef::Item(id),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "sticker {} must have exactly one parent photo",
                    row.id
                )));
            }
        };
        let transform = StickerTransform::new(row.x, row.y, row.scale, row.rotation)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("sticker {} has {e}", row.id))
            })?;

        Ok(Self {
            id: row.id,
            photo,
            sticker_type: StickerType {
                id: row.sticker_type_id,
                name: row.type_name,
                image: row.type_image,
            },
            transform,
        })
    }
}

const STICKER_SELECT: &str = r"
    SELECT s.id, s.visit_photo_id, s.item_photo_id, s.sticker_type_id,
           t.name AS type_name, t.image AS type_image,
           s.x, s.y, s.scale, s.rotation
    FROM passport.sticker s
    JOIN passport.sticker_type t ON t.id = s.sticker_type_id
";

fn decode_all(rows: Vec<StickerRow>) -> Result<Vec<Sticker>, RepositoryError> {
    rows.into_iter().map(Sticker::try_from).collect()
}

/// Stickers placed on any of the given visit photos, oldest first.
pub(crate) async fn stickers_for_visit_photos(
    conn: &mut PgConnection,
    photo_ids: &[VisitPhotoId],
) -> Result<Vec<Sticker>, RepositoryError> {
    if photo_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, StickerRow>(&format!(
        "{STICKER_SELECT} WHERE s.visit_photo_id = ANY($1) ORDER BY s.id"
    ))
    .bind(photo_ids)
    .fetch_all(&mut *conn)
    .await?;

    decode_all(rows)
}

/// Stickers placed on any of the given item photos, oldest first.
pub(crate) async fn stickers_for_item_photos(
    conn: &mut PgConnection,
    photo_ids: &[ItemPhotoId],
) -> Result<Vec<Sticker>, RepositoryError> {
    if photo_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, StickerRow>(&format!(
        "{STICKER_SELECT} WHERE s.item_photo_id = ANY($1) ORDER BY s.id"
    ))
    .bind(photo_ids)
    .fetch_all(&mut *conn)
    .await?;

    decode_all(rows)
}

/// Repository for stickers and the sticker catalog.
pub struct StickerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StickerRepository<'a> {
    /// Create a new sticker repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The sticker catalog ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_types(&self) -> Result<Vec<StickerType>, RepositoryError> {
        let types = sqlx::query_as::<_, StickerType>(
            "SELECT id, name, image FROM passport.sticker_type ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(types)
    }

    /// Look up a sticker type by its exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn type_by_name(&self, name: &str) -> Result<Option<StickerType>, RepositoryError> {
        let sticker_type = sqlx::query_as::<_, StickerType>(
            "SELECT id, name, image FROM passport.sticker_type WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(sticker_type)
    }

    /// Insert a sticker type, or update the image of an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_type(&self, name: &str, image: &str) -> Result<StickerType, RepositoryError> {
        let sticker_type = sqlx::query_as::<_, StickerType>(
            r"
            INSERT INTO passport.sticker_type (name, image)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET image = EXCLUDED.image
            RETURNING id, name, image
            ",
        )
        .bind(name)
        .bind(image)
        .fetch_one(self.pool)
        .await?;

        Ok(sticker_type)
    }

    /// Owner of the visit a photo belongs to, `None` if the photo does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn photo_owner(&self, photo: PhotoRef) -> Result<Option<UserId>, RepositoryError> {
        let query = match photo {
            PhotoRef::Visit(id) => sqlx::query_scalar::<_, UserId>(
                r"
                SELECT v.user_id
                FROM passport.visit_photo vp
                JOIN passport.visit v ON v.id = vp.visit_id
                WHERE vp.id = $1
                ",
            )
            .bind(id.as_i32()),
            PhotoRef::Item(id) => sqlx::query_scalar::<_, UserId>(
                r"
                SELECT v.user_id
                FROM passport.item_photo ip
                JOIN passport.favorite_item fi ON fi.id = ip.item_id
                JOIN passport.visit v ON v.id = fi.visit_id
                WHERE ip.id = $1
                ",
            )
            .bind(id.as_i32()),
        };

        Ok(query.fetch_optional(self.pool).await?)
    }

    /// Owner of the visit a sticker ultimately belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sticker_owner(&self, id: StickerId) -> Result<Option<UserId>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, UserId>(
            r"
            SELECT v.user_id
            FROM passport.sticker s
            LEFT JOIN passport.visit_photo vp ON vp.id = s.visit_photo_id
            LEFT JOIN passport.item_photo ip ON ip.id = s.item_photo_id
            LEFT JOIN passport.favorite_item fi ON fi.id = ip.item_id
            JOIN passport.visit v ON v.id = COALESCE(vp.visit_id, fi.visit_id)
            WHERE s.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(owner)
    }

    /// Fetch a single sticker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails or
    /// `RepositoryError::DataCorruption` if the stored row is inconsistent.
    pub async fn get(&self, id: StickerId) -> Result<Option<Sticker>, RepositoryError> {
        let row = sqlx::query_as::<_, StickerRow>(&format!("{STICKER_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Sticker::try_from).transpose()
    }

    /// Place a sticker on a photo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the photo or sticker type
    /// disappeared, or `RepositoryError::Database` for other errors.
    pub async fn create(
        &self,
        photo: PhotoRef,
        sticker_type: StickerTypeId,
        transform: StickerTransform,
    ) -> Result<Sticker, RepositoryError> {
        let (visit_photo_id, item_photo_id) = match photo {
            PhotoRef::Visit(id) => (Some(id), None),
            PhotoRef::Item(id) => (None, Some(id)),
        };

        let id = sqlx::query_scalar::<_, StickerId>(
            r"
            INSERT INTO passport.sticker
                (visit_photo_id, item_photo_id, sticker_type_id, x, y, scale, rotation)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(visit_photo_id)
        .bind(item_photo_id)
        .bind(sticker_type)
        .bind(transform.x)
        .bind(transform.y)
        .bind(transform.scale)
        .bind(transform.rotation)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        tracing::debug!(sticker_id = %id, ?photo, "placed sticker");
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a sticker's transform and return the stored sticker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sticker does not exist.
    pub async fn update_transform(
        &self,
        id: StickerId,
        transform: StickerTransform,
    ) -> Result<Sticker, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE passport.sticker
            SET x = $2, y = $3, scale = $4, rotation = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(transform.x)
        .bind(transform.y)
        .bind(transform.scale)
        .bind(transform.rotation)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a sticker. The photo it was on is untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sticker does not exist.
    pub async fn delete(&self, id: StickerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM passport.sticker WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
