//! Comment API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Actor, Comment, CommentNode, CommentView, CreateCommentRequest, ListCommentsQuery, Page,
    UpdateCommentRequest,
};
use crate::AppState;

/// GET /api/posts/:id/comments - Page of top-level comments with their reply trees.
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    Path(post_id): Path<String>,
    ApiQuery(query): ApiQuery<ListCommentsQuery>,
) -> ApiResult<Page<CommentNode>> {
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    success(state.repo.list_comments(&post_id, &query, viewer_id).await?)
}

/// POST /api/posts/:id/comments - Comment on a post or reply to a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(post_id): Path<String>,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> ApiResult<Comment> {
    success(state.repo.create_comment(&actor, &post_id, &request).await?)
}

/// GET /api/comments/:id - Get a single comment.
pub async fn get_comment(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    Path(id): Path<String>,
) -> ApiResult<CommentView> {
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    match state.repo.get_comment_view(&id, viewer_id).await? {
        Some(comment) => success(comment),
        None => Err(AppError::NotFound(format!("Comment {} not found", id))),
    }
}

/// PUT /api/comments/:id - Edit a comment.
pub async fn update_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Comment> {
    success(state.repo.update_comment(&id, &request.content, &actor).await?)
}

/// DELETE /api/comments/:id - Delete a comment and its replies.
pub async fn delete_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_comment(&id, &actor).await?;
    success(())
}
