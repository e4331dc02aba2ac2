//! Cafe catalog and wishlist types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cafe_passport_core::{CafeId, Rating, TagId, WishlistEntryId};

use super::visit::VisitSummary;

/// A label shared across cafes, e.g. "wifi" or "outdoor seating".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A cafe in the shared catalog.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cafe {
    pub id: CafeId,
    pub name: String,
    pub address: String,
    pub description: String,
    pub google_rating: Option<Rating>,
    pub image_url: Option<String>,
    /// Ordered by name. Loaded separately from the cafe row.
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
}

/// A cafe on a user's wishlist.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub id: WishlistEntryId,
    pub cafe: Cafe,
    pub added_on: DateTime<Utc>,
    /// The user has logged at least one visit to this cafe.
    pub has_been_visited: bool,
}

/// Caller-specific state attached to a cafe detail view.
#[derive(Debug, Clone, Serialize)]
pub struct CafeViewerState {
    pub has_visited: bool,
    pub wishlist_entry: Option<WishlistEntryId>,
    pub visits: Vec<VisitSummary>,
}

/// A cafe with tags and, for signed-in callers, their own history there.
#[derive(Debug, Clone, Serialize)]
pub struct CafeDetail {
    #[serde(flatten)]
    pub cafe: Cafe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<CafeViewerState>,
}
