//! Cafe search filters and query-string parsing.
//!
//! A cafe matches when its name or address contains the text fragment
//! (case-insensitive) and its tag set is a superset of the selected tags.
//! The SQL in [`crate::db::CafeRepository::search`] and
//! [`CafeFilter::matches`] implement the same predicate.

use std::collections::BTreeSet;

use cafe_passport_core::{FieldErrors, TagId};

use crate::models::Cafe;

/// Results per page.
pub const PAGE_SIZE: i64 = 10;

/// Longest accepted search fragment, in characters.
const MAX_QUERY_CHARS: usize = 255;

/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / PAGE_SIZE;

/// A normalized search filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CafeFilter {
    text: Option<String>,
    tag_ids: Vec<TagId>,
}

impl CafeFilter {
    /// Build a filter, trimming the fragment and collapsing duplicate tags.
    ///
    /// A blank fragment means "no text constraint".
    #[must_use]
    pub fn new(text: Option<&str>, tag_ids: impl IntoIterator<Item = TagId>) -> Self {
        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        let tag_ids: BTreeSet<TagId> = tag_ids.into_iter().collect();

        Self {
            text,
            tag_ids: tag_ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Distinct selected tags, ascending.
    #[must_use]
    pub fn tag_ids(&self) -> &[TagId] {
        &self.tag_ids
    }

    /// `ILIKE` pattern for the fragment, with wildcards escaped.
    #[must_use]
    pub fn like_pattern(&self) -> Option<String> {
        self.text.as_deref().map(|t| format!("%{}%", escape_like(t)))
    }

    /// In-memory form of the search predicate.
    #[must_use]
    pub fn matches(&self, cafe: &Cafe) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = cafe.name.to_lowercase().contains(&needle)
                || cafe.address.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        self.tag_ids
            .iter()
            .all(|wanted| cafe.tags.iter().any(|t| t.id == *wanted))
    }
}

/// Escape `%`, `_` and `\` so they match literally in a `LIKE` pattern.
#[must_use]
pub fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parsed `GET /api/cafes/search` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub filter: CafeFilter,
    /// 1-based.
    pub page: i64,
}

impl SearchParams {
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }
}

/// Parse a raw query string such as `q=bean&tags=1&tags=2&page=2`.
///
/// Repeated `tags` keys are accumulated. Unknown keys are ignored.
///
/// # Errors
///
/// Returns field errors for non-numeric tags, an invalid page, or an
/// overlong fragment.
pub fn parse_search_query(raw: Option<&str>) -> Result<SearchParams, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut text: Option<String> = None;
    let mut tags = Vec::new();
    let mut page = 1;

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "q" => {
                if value.chars().count() > MAX_QUERY_CHARS {
                    errors.add("q", format!("must be at most {MAX_QUERY_CHARS} characters"));
                }
                text = Some(value.into_owned());
            }
            "tags" => {
                if value.trim().is_empty() {
                    continue;
                }
                match value.trim().parse::<i32>() {
                    Ok(id) => tags.push(TagId::new(id)),
                    Err(_) => errors.add("tags", format!("'{value}' is not a valid tag id")),
                }
            }
            "page" => match value.trim().parse::<i64>() {
                Ok(n) if (1..=MAX_PAGE).contains(&n) => page = n,
                Ok(n) if n > MAX_PAGE => errors.add("page", format!("must be at most {MAX_PAGE}")),
                _ => errors.add("page", "must be a positive integer"),
            },
            _ => {}
        }
    }

    errors.into_result(SearchParams {
        filter: CafeFilter::new(text.as_deref(), tags),
        page,
    })
}

/// Number of pages needed for `total` results. Always at least one.
#[must_use]
pub const fn page_count(total: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cafe_passport_core::CafeId;

    use super::*;
    use crate::models::Tag;

    fn cafe(name: &str, address: &str, tags: &[i32]) -> Cafe {
        Cafe {
            id: CafeId::new(1),
            name: name.to_string(),
            address: address.to_string(),
            description: String::new(),
            google_rating: None,
            image_url: None,
            tags: tags
                .iter()
                .map(|&id| Tag {
                    id: TagId::new(id),
                    name: format!("tag-{id}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = CafeFilter::new(None, []);
        assert!(filter.matches(&cafe("Blue Bottle", "1 Main St", &[])));
        assert!(filter.matches(&cafe("Tatte", "Boston", &[1, 2])));
    }

    #[test]
    fn test_text_matches_name_or_address_case_insensitively() {
        let filter = CafeFilter::new(Some("  BOTTLE "), []);
        assert!(filter.matches(&cafe("Blue Bottle", "1 Main St", &[])));
        let filter = CafeFilter::new(Some("main"), []);
        assert!(filter.matches(&cafe("Blue Bottle", "1 Main St", &[])));
        let filter = CafeFilter::new(Some("tatte"), []);
        assert!(!filter.matches(&cafe("Blue Bottle", "1 Main St", &[])));
    }

    #[test]
    fn test_tags_require_superset() {
        let filter = CafeFilter::new(None, [TagId::new(1), TagId::new(2)]);
        assert!(filter.matches(&cafe("A", "x", &[1, 2, 3])));
        assert!(!filter.matches(&cafe("B", "x", &[1, 3])));
        assert!(!filter.matches(&cafe("C", "x", &[])));
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let filter = CafeFilter::new(None, [TagId::new(2), TagId::new(1), TagId::new(2)]);
        assert_eq!(filter.tag_ids(), &[TagId::new(1), TagId::new(2)]);
        assert!(filter.matches(&cafe("A", "x", &[1, 2])));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_real\\"), "100\\%\\_real\\\\");
        let filter = CafeFilter::new(Some("50%"), []);
        assert_eq!(filter.like_pattern().unwrap(), "%50\\%%");
        assert_eq!(CafeFilter::new(Some("  "), []).like_pattern(), None);
    }

    #[test]
    fn test_parse_repeated_tags_and_page() {
        let params = parse_search_query(Some("q=blue+bottle&tags=3&tags=1&tags=3&page=2")).unwrap();
        assert_eq!(params.filter.text(), Some("blue bottle"));
        assert_eq!(params.filter.tag_ids(), &[TagId::new(1), TagId::new(3)]);
        assert_eq!(params.page, 2);
        assert_eq!(params.offset(), 10);
    }

    #[test]
    fn test_parse_defaults() {
        let params = parse_search_query(None).unwrap();
        assert_eq!(params.filter, CafeFilter::default());
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let errors = parse_search_query(Some("tags=abc&page=0")).unwrap_err();
        assert!(errors.contains("tags"));
        assert!(errors.contains("page"));
    }

    #[test]
    fn test_parse_rejects_page_past_offset_range() {
        let errors = parse_search_query(Some("page=9223372036854775807")).unwrap_err();
        assert!(errors.contains("page"));

        let last = parse_search_query(Some(&format!("page={MAX_PAGE}"))).unwrap();
        assert_eq!(last.offset(), (MAX_PAGE - 1) * PAGE_SIZE);
        assert!(last.offset() > 0);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
    }
}
