//! Cafe create/edit input validation.

use std::collections::BTreeSet;

use serde::Deserialize;

use cafe_passport_core::{FieldErrors, Rating, TagId};

const MAX_NAME_CHARS: usize = 255;
const MAX_TAG_CHARS: usize = 100;

/// Cafe fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CafeInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    pub google_rating: Option<f64>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    /// Comma-separated tag names, created when missing.
    #[serde(default)]
    pub new_tags: String,
    /// Only honored on create. Defaults to true.
    pub add_to_wishlist: Option<bool>,
}

/// Cafe fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCafe {
    pub name: String,
    pub address: String,
    pub description: String,
    pub google_rating: Option<Rating>,
    pub image_url: Option<String>,
    /// Distinct, ascending.
    pub tag_ids: Vec<TagId>,
    /// Trimmed, distinct, in submission order.
    pub new_tag_names: Vec<String>,
    pub add_to_wishlist: bool,
}

/// Split a comma-separated tag list, trimming names and skipping blanks.
#[must_use]
pub fn split_tag_names(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_owned)
        .collect()
}

fn is_acceptable_image_url(raw: &str) -> bool {
    if raw.starts_with('/') && !raw.starts_with("//") {
        return true;
    }
    url::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Validate cafe input.
///
/// # Errors
///
/// Returns every field problem found.
pub fn validate_cafe(input: CafeInput) -> Result<ValidatedCafe, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.add("name", format!("must be at most {MAX_NAME_CHARS} characters"));
    }

    let address = input.address.trim().to_string();
    if address.is_empty() {
        errors.add("address", "This field is required.");
    } else if address.chars().count() > MAX_NAME_CHARS {
        errors.add("address", format!("must be at most {MAX_NAME_CHARS} characters"));
    }

    let google_rating = match input.google_rating.map(Rating::new).transpose() {
        Ok(rating) => rating,
        Err(e) => {
            errors.add("google_rating", e.to_string());
            None
        }
    };

    let image_url = input
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(url) = &image_url
        && !is_acceptable_image_url(url)
    {
        errors.add("image_url", "Enter a valid URL.");
    }

    let new_tag_names = split_tag_names(&input.new_tags);
    for name in &new_tag_names {
        if name.chars().count() > MAX_TAG_CHARS {
            errors.add(
                "new_tags",
                format!("tag '{name}' must be at most {MAX_TAG_CHARS} characters"),
            );
        }
    }

    let tag_ids: BTreeSet<TagId> = input.tag_ids.into_iter().collect();

    errors.into_result(ValidatedCafe {
        name,
        address,
        description: input.description.trim().to_string(),
        google_rating,
        image_url,
        tag_ids: tag_ids.into_iter().collect(),
        new_tag_names,
        add_to_wishlist: input.add_to_wishlist.unwrap_or(true),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> CafeInput {
        CafeInput {
            name: "Blue Bottle".to_string(),
            address: "1 Main St".to_string(),
            ..CafeInput::default()
        }
    }

    #[test]
    fn test_minimal_cafe_is_valid() {
        let cafe = validate_cafe(input()).unwrap();
        assert_eq!(cafe.name, "Blue Bottle");
        assert!(cafe.add_to_wishlist);
        assert!(cafe.tag_ids.is_empty());
    }

    #[test]
    fn test_required_fields() {
        let errors = validate_cafe(CafeInput::default()).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("address"));
    }

    #[test]
    fn test_google_rating_range() {
        let mut bad = input();
        bad.google_rating = Some(5.5);
        assert!(validate_cafe(bad).unwrap_err().contains("google_rating"));

        let mut good = input();
        good.google_rating = Some(4.6);
        let cafe = validate_cafe(good).unwrap();
        assert!((cafe.google_rating.unwrap().value() - 4.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_image_url() {
        let mut bad = input();
        bad.image_url = Some("ftp://example.com/x.jpg".to_string());
        assert!(validate_cafe(bad).unwrap_err().contains("image_url"));

        let mut blank = input();
        blank.image_url = Some("   ".to_string());
        assert_eq!(validate_cafe(blank).unwrap().image_url, None);

        let mut local = input();
        local.image_url = Some("/static/cafe.jpg".to_string());
        assert!(validate_cafe(local).is_ok());
    }

    #[test]
    fn test_split_tag_names() {
        assert_eq!(
            split_tag_names(" wifi, ,cozy,wifi ,  "),
            vec!["wifi".to_string(), "cozy".to_string()]
        );
        assert!(split_tag_names("").is_empty());
    }

    #[test]
    fn test_tag_ids_deduplicated() {
        let mut i = input();
        i.tag_ids = vec![TagId::new(3), TagId::new(1), TagId::new(3)];
        assert_eq!(validate_cafe(i).unwrap().tag_ids, vec![TagId::new(1), TagId::new(3)]);
    }

    #[test]
    fn test_opt_out_of_wishlist() {
        let mut i = input();
        i.add_to_wishlist = Some(false);
        assert!(!validate_cafe(i).unwrap().add_to_wishlist);
    }
}
