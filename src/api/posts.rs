//! Post API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{Actor, CreatePostRequest, ListPostsQuery, Page, Post, PostView, UpdatePostRequest};
use crate::AppState;

/// GET /api/posts - List published posts.
pub async fn list_posts(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    ApiQuery(query): ApiQuery<ListPostsQuery>,
) -> ApiResult<Page<PostView>> {
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    success(state.repo.list_posts(&query, viewer_id).await?)
}

/// GET /api/posts/pinned - List pinned posts.
pub async fn list_pinned_posts(
    State(state): State<AppState>,
    viewer: Option<Actor>,
) -> ApiResult<Vec<PostView>> {
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    success(state.repo.list_pinned_posts(viewer_id).await?)
}

/// GET /api/posts/:idOrSlug - Get a single post.
pub async fn get_post(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<PostView> {
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    match state.repo.find_post_view(&id_or_slug, viewer_id).await? {
        Some(post) => success(post),
        None => Err(AppError::NotFound(format!("Post {} not found", id_or_slug))),
    }
}

/// POST /api/posts - Create a new post.
pub async fn create_post(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> ApiResult<Post> {
    let post = state.repo.create_post(&actor, &request).await?;

    if let Err(e) = state.search.index_post(&post).await {
        tracing::warn!("Failed to index post {}: {}", post.id, e);
    }

    success(post)
}

/// PUT /api/posts/:id - Update a post.
pub async fn update_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdatePostRequest>,
) -> ApiResult<Post> {
    let post = state.repo.update_post(&id, &request, &actor).await?;

    if let Err(e) = state.search.index_post(&post).await {
        tracing::warn!("Failed to re-index post {}: {}", post.id, e);
    }

    success(post)
}

/// DELETE /api/posts/:id - Delete a post with its comments, votes and shares.
pub async fn delete_post(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_post(&id, &actor).await?;

    if let Err(e) = state.search.remove_post(&id).await {
        tracing::warn!("Failed to remove post {} from index: {}", id, e);
    }

    success(())
}
