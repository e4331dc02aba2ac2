//! Core types for Cafe Passport.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod field_errors;
pub mod id;
pub mod money;
pub mod rating;
pub mod sticker;
pub mod theme;

pub use field_errors::FieldErrors;
pub use id::*;
pub use money::{Money, MoneyError};
pub use rating::{Rating, RatingError};
pub use sticker::{PhotoRef, StickerTransform, TransformError};
pub use theme::{Theme, ThemeError};
