//! Cafe search handler.

use axum::{
    Json,
    extract::{RawQuery, State},
};
use serde::Serialize;

use crate::db::CafeRepository;
use crate::error::Result;
use crate::models::{Cafe, Tag};
use crate::services::search::{page_count, parse_search_query};
use crate::state::AppState;

/// Search response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Cafe>,
    pub total: i64,
    pub page: i64,
    pub page_count: i64,
    /// The trimmed text fragment, if any.
    pub query: Option<String>,
    /// Tags the results were filtered by.
    pub selected_tags: Vec<Tag>,
}

/// Search cafes by name/address fragment and required tags.
///
/// GET /api/cafes/search?q=...&tags=1&tags=2&page=1
///
/// # Errors
///
/// Returns 400 for malformed parameters.
pub async fn search(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<SearchResponse>> {
    let params = parse_search_query(raw.as_deref())?;
    let cafes = CafeRepository::new(state.pool());

    let page = cafes.search(&params.filter, params.offset()).await?;
    let selected_tags = if params.filter.tag_ids().is_empty() {
        Vec::new()
    } else {
        cafes.tags_by_ids(params.filter.tag_ids()).await?
    };

    tracing::debug!(
        query = ?params.filter.text(),
        tags = params.filter.tag_ids().len(),
        total = page.total,
        "cafe search"
    );

    Ok(Json(SearchResponse {
        results: page.cafes,
        total: page.total,
        page: params.page,
        page_count: page_count(page.total),
        query: params.filter.text().map(str::to_owned),
        selected_tags,
    }))
}
