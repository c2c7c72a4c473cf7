//! User API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{Actor, Page, PageQuery, PageRequest, PostView, UpdateRoleRequest, User};
use crate::AppState;

const DEFAULT_AUTHOR_PAGE_SIZE: u32 = 20;

/// GET /api/me - The caller, with the effective role.
pub async fn get_me(State(state): State<AppState>, actor: Actor) -> ApiResult<User> {
    let user = state
        .repo
        .get_user(&actor.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", actor.user_id)))?;

    success(User {
        role: actor.role,
        ..user
    })
}

/// PUT /api/users/:id/role - Promote or demote a user. Admin only.
pub async fn update_user_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> ApiResult<User> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden("Only admins can change roles".to_string()));
    }
    success(state.repo.update_role(&id, request.role).await?)
}

/// GET /api/users/:id/posts - An author's published posts, newest first.
pub async fn list_user_posts(
    State(state): State<AppState>,
    viewer: Option<Actor>,
    Path(author_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<PostView>> {
    if state.repo.get_user(&author_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", author_id)));
    }

    let page = PageRequest::new(query.page, query.page_size, DEFAULT_AUTHOR_PAGE_SIZE);
    let viewer_id = viewer.as_ref().map(|a| a.user_id.as_str());
    success(
        state
            .repo
            .list_posts_by_author(&author_id, page, viewer_id)
            .await?,
    )
}
