//! User and profile types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cafe_passport_core::{Theme, UserId};

use super::cafe::WishlistEntry;
use super::visit::VisitSummary;

/// A registered user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user profile, created alongside the user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub bio: String,
    pub home_city: String,
    /// Path under the media root, if a picture was uploaded.
    pub profile_picture: Option<String>,
    pub theme: Theme,
}

/// Everything shown on a user's own profile page.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOverview {
    pub username: String,
    pub profile: Profile,
    /// Newest first.
    pub visits: Vec<VisitSummary>,
    pub wishlist: Vec<WishlistEntry>,
}
