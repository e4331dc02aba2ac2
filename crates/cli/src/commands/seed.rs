//! Seed the shared catalog (tags and sticker types) from YAML.
//!
//! ```yaml
//! tags:
//!   - Cozy
//!   - Wifi
//! sticker_types:
//!   - name: heart
//!     image: stickers/heart.png
//! ```
//!
//! Seeding is idempotent: existing tags are kept and existing sticker types
//! have their image path replaced.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use cafe_passport_server::db::{CafeRepository, StickerRepository};

/// Contents of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sticker_types: Vec<StickerTypeSeed>,
}

/// One sticker type entry.
#[derive(Debug, Deserialize)]
pub struct StickerTypeSeed {
    pub name: String,
    pub image: String,
}

/// Check a seed file for blank or duplicate entries.
#[must_use]
pub fn validate_seed(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let mut tags = HashSet::new();
    for tag in &seed.tags {
        let name = tag.trim();
        if name.is_empty() {
            errors.push("tag names must not be blank".to_string());
        } else if name.chars().count() > 100 {
            errors.push(format!("tag name too long: {name}"));
        } else if !tags.insert(name.to_lowercase()) {
            errors.push(format!("duplicate tag: {name}"));
        }
    }

    let mut stickers = HashSet::new();
    for sticker in &seed.sticker_types {
        let name = sticker.name.trim();
        if name.is_empty() {
            errors.push("sticker type names must not be blank".to_string());
        } else if !stickers.insert(name) {
            errors.push(format!("duplicate sticker type: {name}"));
        }
        if sticker.image.trim().is_empty() {
            errors.push(format!("sticker type {name} has no image"));
        }
    }

    errors
}

/// Load and apply a catalog seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;

    let names: Vec<String> = seed.tags.iter().map(|t| t.trim().to_owned()).collect();
    let tags = if names.is_empty() {
        Vec::new()
    } else {
        CafeRepository::new(&pool).ensure_tags(&names).await?
    };

    let stickers = StickerRepository::new(&pool);
    for sticker in &seed.sticker_types {
        let stored = stickers
            .upsert_type(sticker.name.trim(), sticker.image.trim())
            .await?;
        info!(id = %stored.id, name = %stored.name, "sticker type seeded");
    }

    info!("Seeding complete!");
    info!("  Tags: {}", tags.len());
    info!("  Sticker types: {}", seed.sticker_types.len());

    Ok(())
}
