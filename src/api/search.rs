//! Search API endpoints.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{success, ApiQuery, ApiResult};
use crate::models::{Actor, PostStatus, PostView};
use crate::search::MAX_SEARCH_LIMIT;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search results with paging metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    /// Indexed posts matching the query, across all pages.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub post: PostView,
    pub score: f32,
}

/// GET /api/search - Full-text search over published posts.
pub async fn search_posts(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);

    let hits = state.search.search(&params.q, limit, params.offset)?;

    let ids: Vec<String> = hits.results.iter().map(|h| h.post_id.clone()).collect();
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    let views = state.repo.post_views_by_ids(&ids, viewer_id).await?;

    // The index can lag behind status changes; the database has the final say
    let results: Vec<SearchResultItem> = hits
        .results
        .into_iter()
        .filter_map(|hit| {
            let post = views
                .iter()
                .find(|v| v.post.id == hit.post_id && v.post.status == PostStatus::Published)?
                .clone();
            Some(SearchResultItem {
                post,
                score: hit.score,
            })
        })
        .collect();

    success(SearchResponse {
        results,
        total: hits.total,
        limit,
        offset: params.offset,
    })
}
