//! Domain models.
//!
//! Row-shaped structs derive `sqlx::FromRow` directly; the core newtypes
//! (`Rating`, `Money`, `Theme`, typed IDs) validate on decode so a corrupt row
//! surfaces as a decode error instead of an out-of-range value.

pub mod cafe;
pub mod session;
pub mod stats;
pub mod sticker;
pub mod user;
pub mod visit;

pub use cafe::{Cafe, CafeDetail, CafeViewerState, Tag, WishlistEntry};
pub use session::{CurrentUser, keys as session_keys};
pub use stats::{FavoriteItemStats, TagCount, UserStats, VisitStats, WishlistStats};
pub use sticker::{Sticker, StickerType};
pub use user::{Profile, ProfileOverview, User};
pub use visit::{
    FavoriteItem, FavoriteItemDetail, ItemPhoto, PhotoView, Visit, VisitDetail, VisitPhoto,
    VisitSummary,
};
