//! Rounding and derived metrics for the stats page.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{FavoriteItemStats, TagCount, UserStats, VisitStats, WishlistStats};

/// Number of tags listed as the user's top tags.
pub const TOP_TAGS: usize = 5;

/// Aggregates as they come out of the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStats {
    pub total_visits: i64,
    pub avg_spend: Option<Decimal>,
    pub avg_rating: Option<f64>,
    pub wishlist_total: i64,
    pub wishlist_visited: i64,
    pub total_items: i64,
    pub avg_item_price: Option<Decimal>,
    pub avg_item_rating: Option<f64>,
    /// Ordered by count descending, then name.
    pub tags: Vec<TagCount>,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Visited entries over all entries. An empty wishlist converts at `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn conversion_rate(visited: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (visited.clamp(0, total) as f64) / (total as f64)
}

/// Build the user-facing stats from raw aggregates.
#[must_use]
pub fn summarize(raw: RawStats) -> UserStats {
    let has_visits = raw.total_visits > 0;
    let has_items = raw.total_items > 0;
    let rate = conversion_rate(raw.wishlist_visited, raw.wishlist_total);
    let top_tags = raw.tags.iter().take(TOP_TAGS).cloned().collect();

    UserStats {
        visits: VisitStats {
            total_visits: raw.total_visits,
            avg_spend: raw.avg_spend.filter(|_| has_visits).map(round_money),
            avg_rating: raw.avg_rating.filter(|_| has_visits).map(round_one),
        },
        wishlist: WishlistStats {
            total: raw.wishlist_total,
            visited: raw.wishlist_visited,
            unvisited: (raw.wishlist_total - raw.wishlist_visited).max(0),
            conversion_rate: rate,
            conversion_percent: round_one(rate * 100.0),
        },
        favorite_items: FavoriteItemStats {
            total_items: raw.total_items,
            avg_price: raw.avg_item_price.filter(|_| has_items).map(round_money),
            avg_rating: raw.avg_item_rating.filter(|_| has_items).map(round_one),
        },
        tag_distribution: raw.tags,
        top_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_passport_core::TagId;
    use std::str::FromStr;

    fn tag(id: i32, name: &str, count: i64) -> TagCount {
        TagCount {
            tag_id: TagId::new(id),
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_no_visits_gives_null_averages() {
        let stats = summarize(RawStats::default());
        assert_eq!(stats.visits.total_visits, 0);
        assert_eq!(stats.visits.avg_spend, None);
        assert_eq!(stats.visits.avg_rating, None);
        assert_eq!(stats.favorite_items.avg_price, None);
        assert_eq!(stats.favorite_items.avg_rating, None);
    }

    #[test]
    fn test_empty_wishlist_converts_at_zero() {
        assert!(conversion_rate(0, 0).abs() < f64::EPSILON);
        let stats = summarize(RawStats::default());
        assert!(stats.wishlist.conversion_rate.abs() < f64::EPSILON);
        assert!(stats.wishlist.conversion_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_conversion_rate_stays_in_unit_interval() {
        for (visited, total) in [(0, 3), (1, 3), (3, 3), (5, 3), (-1, 3)] {
            let rate = conversion_rate(visited, total);
            assert!((0.0..=1.0).contains(&rate), "{visited}/{total} gave {rate}");
        }
    }

    #[test]
    fn test_rounding() {
        let stats = summarize(RawStats {
            total_visits: 3,
            avg_spend: Some(Decimal::from_str("12.505").unwrap_or_default()),
            avg_rating: Some(3.666_666),
            wishlist_total: 3,
            wishlist_visited: 1,
            ..RawStats::default()
        });
        assert_eq!(stats.visits.avg_spend, Decimal::from_str("12.51").ok());
        assert!((stats.visits.avg_rating.unwrap_or_default() - 3.7).abs() < 1e-9);
        assert!((stats.wishlist.conversion_percent - 33.3).abs() < 1e-9);
        assert_eq!(stats.wishlist.unvisited, 2);
    }

    #[test]
    fn test_single_visit_scenario() {
        let stats = summarize(RawStats {
            total_visits: 1,
            avg_spend: Some(Decimal::new(1250, 2)),
            avg_rating: Some(4.0),
            total_items: 1,
            avg_item_price: Some(Decimal::new(550, 2)),
            avg_item_rating: Some(4.5),
            ..RawStats::default()
        });
        assert_eq!(stats.visits.avg_spend, Some(Decimal::new(1250, 2)));
        assert_eq!(stats.visits.avg_rating, Some(4.0));
        assert_eq!(stats.favorite_items.avg_price, Some(Decimal::new(550, 2)));
        assert_eq!(stats.favorite_items.avg_rating, Some(4.5));
    }

    #[test]
    fn test_top_tags_truncated() {
        let tags: Vec<TagCount> = (1..=7).map(|i| tag(i, &format!("t{i}"), 10 - i64::from(i))).collect();
        let stats = summarize(RawStats {
            tags: tags.clone(),
            ..RawStats::default()
        });
        assert_eq!(stats.tag_distribution, tags);
        assert_eq!(stats.top_tags.len(), TOP_TAGS);
        assert_eq!(stats.top_tags.first().map(|t| t.name.as_str()), Some("t1"));
    }
}
