//! Aggregate statistics for a single user.

use rust_decimal::Decimal;
use serde::Serialize;

use cafe_passport_core::TagId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitStats {
    pub total_visits: i64,
    /// Two decimal places; `None` with no visits.
    pub avg_spend: Option<Decimal>,
    /// One decimal place; `None` with no visits.
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WishlistStats {
    pub total: i64,
    pub visited: i64,
    pub unvisited: i64,
    /// Visited entries over all entries, in `[0, 1]`. `0.0` for an empty wishlist.
    pub conversion_rate: f64,
    /// `conversion_rate` as a percentage with one decimal place.
    pub conversion_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteItemStats {
    pub total_items: i64,
    pub avg_price: Option<Decimal>,
    pub avg_rating: Option<f64>,
}

/// Number of distinct visited cafes carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub tag_id: TagId,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub visits: VisitStats,
    pub wishlist: WishlistStats,
    pub favorite_items: FavoriteItemStats,
    /// Ordered by count descending, then name.
    pub tag_distribution: Vec<TagCount>,
    pub top_tags: Vec<TagCount>,
}
