//! Cafe Passport Core - Shared types library.
//!
//! This crate provides common types used across all Cafe Passport components:
//! - `server` - JSON API for visits, cafes, wishlist, stickers and stats
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, ratings, money, themes,
//!   sticker transforms and field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
