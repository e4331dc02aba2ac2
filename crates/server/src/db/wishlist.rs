//! Wishlist repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cafe_passport_core::{CafeId, Rating, UserId, WishlistEntryId};

use super::RepositoryError;
use super::cafes::attach_tags;
use crate::models::{Cafe, WishlistEntry};

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: WishlistEntryId,
    added_on: DateTime<Utc>,
    has_been_visited: bool,
    cafe_id: CafeId,
    name: String,
    address: String,
    description: String,
    google_rating: Option<Rating>,
    image_url: Option<String>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        Self {
            id: row.id,
            added_on: row.added_on,
            has_been_visited: row.has_been_visited,
            cafe: Cafe {
                id: row.cafe_id,
                name: row.name,
                address: row.address,
                description: row.description,
                google_rating: row.google_rating,
                image_url: row.image_url,
                tags: Vec::new(),
            },
        }
    }
}

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's wishlist, most recently added first, with visited flags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT w.id, w.added_on,
                   EXISTS (
                       SELECT 1 FROM passport.visit v
                       WHERE v.user_id = w.user_id AND v.cafe_id = w.cafe_id
                   ) AS has_been_visited,
                   c.id AS cafe_id, c.name, c.address, c.description,
                   c.google_rating, c.image_url
            FROM passport.wishlist_entry w
            JOIN passport.cafe c ON c.id = w.cafe_id
            WHERE w.user_id = $1
            ORDER BY w.added_on DESC, w.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut entries: Vec<WishlistEntry> = rows.into_iter().map(Into::into).collect();

        let mut cafes: Vec<Cafe> = entries.iter().map(|e| e.cafe.clone()).collect();
        let mut conn = self.pool.acquire().await?;
        attach_tags(&mut conn, &mut cafes).await?;
        for (entry, cafe) in entries.iter_mut().zip(cafes) {
            entry.cafe = cafe;
        }

        Ok(entries)
    }

    /// The user's entry for a cafe, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<Option<WishlistEntryId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, WishlistEntryId>(
            "SELECT id FROM passport.wishlist_entry WHERE user_id = $1 AND cafe_id = $2",
        )
        .bind(user_id)
        .bind(cafe_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Add a cafe to the wishlist.
    ///
    /// Returns the entry ID and whether it was newly created. Adding a cafe
    /// twice returns the existing entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cafe does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        user_id: UserId,
        cafe_id: CafeId,
    ) -> Result<(WishlistEntryId, bool), RepositoryError> {
        let inserted = sqlx::query_scalar::<_, WishlistEntryId>(
            r"
            INSERT INTO passport.wishlist_entry (user_id, cafe_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, cafe_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(cafe_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        if let Some(id) = inserted {
            return Ok((id, true));
        }

        let existing = self
            .find(user_id, cafe_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok((existing, false))
    }

    /// Remove a cafe from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cafe was not on the wishlist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn remove(&self, user_id: UserId, cafe_id: CafeId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM passport.wishlist_entry WHERE user_id = $1 AND cafe_id = $2")
                .bind(user_id)
                .bind(cafe_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
