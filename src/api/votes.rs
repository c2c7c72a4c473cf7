//! Vote API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiResult};
use crate::models::{Actor, CastTargetVoteRequest, CastVoteRequest, VoteResult, VoteTarget, VoteValue};
use crate::AppState;

/// POST /api/posts/:id/vote - Vote on a post.
pub async fn vote_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(post_id): Path<String>,
    ApiJson(request): ApiJson<CastVoteRequest>,
) -> ApiResult<VoteResult> {
    let value = VoteValue::try_from(request.value)?;
    let target = VoteTarget::Post(post_id);
    success(state.repo.cast_vote(&actor.user_id, &target, value).await?)
}

/// POST /api/comments/:id/vote - Vote on a comment.
pub async fn vote_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(comment_id): Path<String>,
    ApiJson(request): ApiJson<CastVoteRequest>,
) -> ApiResult<VoteResult> {
    let value = VoteValue::try_from(request.value)?;
    let target = VoteTarget::Comment(comment_id);
    success(state.repo.cast_vote(&actor.user_id, &target, value).await?)
}

/// POST /api/votes - Vote with the target named in the body.
pub async fn cast_vote(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<CastTargetVoteRequest>,
) -> ApiResult<VoteResult> {
    let value = VoteValue::try_from(request.value)?;
    let target = VoteTarget::from_parts(request.post_id, request.comment_id)?;
    success(state.repo.cast_vote(&actor.user_id, &target, value).await?)
}
