//! Share API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::{ShareCount, ShareRequest};
use crate::AppState;

/// POST /api/posts/:id/share - Record a share. No identity needed.
///
/// The event is analytics only, so a failed write is logged and the request
/// still succeeds.
pub async fn share_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ApiJson(request): ApiJson<ShareRequest>,
) -> ApiResult<()> {
    if state.repo.get_post(&post_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
    }

    if let Err(e) = state.repo.record_share(&post_id, request.platform).await {
        tracing::warn!("Failed to record share for post {}: {}", post_id, e);
    }

    success(())
}

/// GET /api/posts/:id/shares - Share count for a post.
pub async fn count_shares(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<ShareCount> {
    if state.repo.get_post(&post_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Post {} not found", post_id)));
    }

    let shares = state.repo.count_shares(&post_id).await?;
    success(ShareCount { post_id, shares })
}
