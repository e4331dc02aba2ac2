//! Raw per-user aggregates.

use rust_decimal::Decimal;
use sqlx::PgPool;

use cafe_passport_core::UserId;

use super::RepositoryError;
use crate::models::TagCount;
use crate::services::stats::RawStats;

#[derive(sqlx::FromRow)]
struct Totals {
    total_visits: i64,
    avg_spend: Option<Decimal>,
    avg_rating: Option<f64>,
    wishlist_total: i64,
    wishlist_visited: i64,
    total_items: i64,
    avg_item_price: Option<Decimal>,
    avg_item_rating: Option<f64>,
}

/// Repository for statistics queries.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Unrounded aggregates for one user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn raw(&self, user_id: UserId) -> Result<RawStats, RepositoryError> {
        let totals = sqlx::query_as::<_, Totals>(
            r"
            SELECT
                (SELECT COUNT(*) FROM passport.visit WHERE user_id = $1) AS total_visits,
                (SELECT AVG(amount_spent) FROM passport.visit WHERE user_id = $1) AS avg_spend,
                (SELECT AVG(rating) FROM passport.visit WHERE user_id = $1) AS avg_rating,
                (SELECT COUNT(*) FROM passport.wishlist_entry WHERE user_id = $1)
                    AS wishlist_total,
                (SELECT COUNT(*) FROM passport.wishlist_entry w
                 WHERE w.user_id = $1 AND EXISTS (
                     SELECT 1 FROM passport.visit v
                     WHERE v.user_id = w.user_id AND v.cafe_id = w.cafe_id
                 )) AS wishlist_visited,
                COALESCE(items.total, 0) AS total_items,
                items.avg_price AS avg_item_price,
                items.avg_rating AS avg_item_rating
            FROM (
                SELECT COUNT(*) AS total, AVG(fi.price) AS avg_price, AVG(fi.rating) AS avg_rating
                FROM passport.favorite_item fi
                JOIN passport.visit v ON v.id = fi.visit_id
                WHERE v.user_id = $1
            ) items
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, TagCount>(
            r"
            SELECT t.id AS tag_id, t.name, COUNT(DISTINCT ct.cafe_id) AS count
            FROM passport.tag t
            JOIN passport.cafe_tag ct ON ct.tag_id = t.id
            WHERE ct.cafe_id IN (SELECT cafe_id FROM passport.visit WHERE user_id = $1)
            GROUP BY t.id, t.name
            ORDER BY count DESC, t.name
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(RawStats {
            total_visits: totals.total_visits,
            avg_spend: totals.avg_spend,
            avg_rating: totals.avg_rating,
            wishlist_total: totals.wishlist_total,
            wishlist_visited: totals.wishlist_visited,
            total_items: totals.total_items,
            avg_item_price: totals.avg_item_price,
            avg_item_rating: totals.avg_item_rating,
            tags,
        })
    }
}
