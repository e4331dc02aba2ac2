//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup, login and password hashing (argon2)
//! - `catalog` - Cafe create/edit input validation
//! - `media` - Image sniffing and filesystem storage
//! - `search` - Search query parsing and the cafe match predicate
//! - `stats` - Aggregation of per-user statistics
//! - `visit_submission` - Multipart visit create/edit, validated and applied atomically

pub mod auth;
pub mod catalog;
pub mod media;
pub mod search;
pub mod stats;
pub mod visit_submission;
