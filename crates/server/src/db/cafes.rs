//! Cafe catalog and tag repository.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use cafe_passport_core::{CafeId, TagId, UserId};

use super::RepositoryError;
use crate::models::{Cafe, Tag};
use crate::services::catalog::ValidatedCafe;
use crate::services::search::{CafeFilter, PAGE_SIZE};

#[derive(sqlx::FromRow)]
struct CafeTagRow {
    cafe_id: CafeId,
    id: TagId,
    name: String,
}

/// A page of search results.
#[derive(Debug)]
pub struct SearchPage {
    pub cafes: Vec<Cafe>,
    pub total: i64,
}

const CAFE_COLUMNS: &str = "c.id, c.name, c.address, c.description, c.google_rating, c.image_url";

/// Repository for cafe and tag database operations.
pub struct CafeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CafeRepository<'a> {
    /// Create a new cafe repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All cafes ordered by name, with tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Cafe>, RepositoryError> {
        let mut cafes = sqlx::query_as::<_, Cafe>(&format!(
            "SELECT {CAFE_COLUMNS} FROM passport.cafe c ORDER BY c.name, c.id"
        ))
        .fetch_all(self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        attach_tags(&mut conn, &mut cafes).await?;
        Ok(cafes)
    }

    /// Get a cafe with its tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CafeId) -> Result<Option<Cafe>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_cafe(&mut conn, id).await
    }

    /// Whether a cafe exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CafeId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM passport.cafe WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// All tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM passport.tag ORDER BY name, id")
            .fetch_all(self.pool)
            .await?;

        Ok(tags)
    }

    /// Tags with the given IDs, ordered by name. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>, RepositoryError> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, name FROM passport.tag WHERE id = ANY($1) ORDER BY name, id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// Get-or-create tags by name, returning them ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO passport.tag (name)
            SELECT unnest($1::text[])
            ON CONFLICT (name) DO NOTHING
            ",
        )
        .bind(names)
        .execute(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, name FROM passport.tag WHERE name = ANY($1) ORDER BY name, id",
        )
        .bind(names)
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// Create a cafe with its tags, optionally wishlisting it for `wishlist_for`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if a referenced tag does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        cafe: &ValidatedCafe,
        wishlist_for: Option<UserId>,
    ) -> Result<Cafe, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, CafeId>(
            r"
            INSERT INTO passport.cafe (name, address, description, google_rating, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&cafe.name)
        .bind(&cafe.address)
        .bind(&cafe.description)
        .bind(cafe.google_rating)
        .bind(cafe.image_url.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        set_tags(&mut tx, id, cafe).await?;

        if let Some(user_id) = wishlist_for {
            sqlx::query(
                r"
                INSERT INTO passport.wishlist_entry (user_id, cafe_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, cafe_id) DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let created = get_cafe(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(created)
    }

    /// Update a cafe's fields and replace its tag set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cafe or a referenced tag does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: CafeId, cafe: &ValidatedCafe) -> Result<Cafe, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE passport.cafe
            SET name = $2, address = $3, description = $4, google_rating = $5, image_url = $6
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&cafe.name)
        .bind(&cafe.address)
        .bind(&cafe.description)
        .bind(cafe.google_rating)
        .bind(cafe.image_url.as_deref())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM passport.cafe_tag WHERE cafe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        set_tags(&mut tx, id, cafe).await?;

        let updated = get_cafe(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a cafe and everything that hangs off it.
    ///
    /// Returns the media paths of every photo removed with it so the caller
    /// can delete the files once the transaction has committed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cafe does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: CafeId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let images = sqlx::query_scalar::<_, String>(
            r"
            SELECT vp.image
            FROM passport.visit_photo vp
            JOIN passport.visit v ON v.id = vp.visit_id
            WHERE v.cafe_id = $1
            UNION ALL
            SELECT ip.image
            FROM passport.item_photo ip
            JOIN passport.favorite_item fi ON fi.id = ip.item_id
            JOIN passport.visit v ON v.id = fi.visit_id
            WHERE v.cafe_id = $1
            ",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM passport.cafe WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(images)
    }

    /// Run a search and return one page of results plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filter: &CafeFilter,
        offset: i64,
    ) -> Result<SearchPage, RepositoryError> {
        // $1: ILIKE pattern or NULL, $2: required tag ids
        let predicate = r"
            ($1::text IS NULL OR c.name ILIKE $1 OR c.address ILIKE $1)
            AND (
                SELECT COUNT(DISTINCT ct.tag_id)
                FROM passport.cafe_tag ct
                WHERE ct.cafe_id = c.id AND ct.tag_id = ANY($2)
            ) = cardinality($2)
        ";
        let pattern = filter.like_pattern();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM passport.cafe c WHERE {predicate}"
        ))
        .bind(pattern.as_deref())
        .bind(filter.tag_ids())
        .fetch_one(self.pool)
        .await?;

        let mut cafes = sqlx::query_as::<_, Cafe>(&format!(
            "SELECT {CAFE_COLUMNS} FROM passport.cafe c WHERE {predicate}
             ORDER BY c.name, c.id
             LIMIT $3 OFFSET $4"
        ))
        .bind(pattern.as_deref())
        .bind(filter.tag_ids())
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        attach_tags(&mut conn, &mut cafes).await?;

        Ok(SearchPage { cafes, total })
    }
}

/// Load a cafe and its tags on an existing connection.
pub(crate) async fn get_cafe(
    conn: &mut PgConnection,
    id: CafeId,
) -> Result<Option<Cafe>, RepositoryError> {
    let cafe = sqlx::query_as::<_, Cafe>(&format!(
        "SELECT {CAFE_COLUMNS} FROM passport.cafe c WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match cafe {
        Some(cafe) => {
            let mut cafes = vec![cafe];
            attach_tags(conn, &mut cafes).await?;
            Ok(cafes.pop())
        }
        None => Ok(None),
    }
}

/// Fill `tags` on each cafe.
pub(crate) async fn attach_tags(
    conn: &mut PgConnection,
    cafes: &mut [Cafe],
) -> Result<(), RepositoryError> {
    if cafes.is_empty() {
        return Ok(());
    }
    let ids: Vec<CafeId> = cafes.iter().map(|c| c.id).collect();

    let rows = sqlx::query_as::<_, CafeTagRow>(
        r"
        SELECT ct.cafe_id, t.id, t.name
        FROM passport.cafe_tag ct
        JOIN passport.tag t ON t.id = ct.tag_id
        WHERE ct.cafe_id = ANY($1)
        ORDER BY t.name, t.id
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_cafe: HashMap<CafeId, Vec<Tag>> = HashMap::new();
    for row in rows {
        by_cafe.entry(row.cafe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }
    for cafe in cafes {
        cafe.tags = by_cafe.remove(&cafe.id).unwrap_or_default();
    }
    Ok(())
}

/// Attach existing tags and get-or-create the named ones.
async fn set_tags(
    conn: &mut PgConnection,
    cafe_id: CafeId,
    cafe: &ValidatedCafe,
) -> Result<(), RepositoryError> {
    let mut tag_ids = cafe.tag_ids.clone();

    if !tag_ids.is_empty() {
        let known = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM passport.tag WHERE id = ANY($1)",
        )
        .bind(&tag_ids)
        .fetch_one(&mut *conn)
        .await?;
        if usize::try_from(known).ok() != Some(tag_ids.len()) {
            return Err(RepositoryError::NotFound);
        }
    }

    if !cafe.new_tag_names.is_empty() {
        sqlx::query(
            r"
            INSERT INTO passport.tag (name)
            SELECT unnest($1::text[])
            ON CONFLICT (name) DO NOTHING
            ",
        )
        .bind(&cafe.new_tag_names)
        .execute(&mut *conn)
        .await?;

        let created = sqlx::query_scalar::<_, TagId>(
            "SELECT id FROM passport.tag WHERE name = ANY($1)",
        )
        .bind(&cafe.new_tag_names)
        .fetch_all(&mut *conn)
        .await?;
        tag_ids.extend(created);
    }

    if !tag_ids.is_empty() {
        sqlx::query(
            r"
            INSERT INTO passport.cafe_tag (cafe_id, tag_id)
            SELECT $1, unnest($2::int4[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(cafe_id)
        .bind(&tag_ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
