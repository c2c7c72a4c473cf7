//! Post lifecycle and listing operations.

use chrono::Utc;

use super::repository::{
    ensure_can_modify, post_from_row, post_view_from_row, Repository, POST_COLUMNS,
    POST_VIEW_SELECT,
};
use super::timestamp;
use crate::errors::AppError;
use crate::models::{
    generate_slug, validate_post_content, validate_title, Actor, CreatePostRequest,
    ListPostsQuery, Page, PageRequest, Post, PostStatus, PostView, UpdatePostRequest,
};
use crate::ranking::hot_score;

const DEFAULT_POST_PAGE_SIZE: u32 = 20;

impl Repository {
    /// Create a published post owned by `actor`.
    ///
    /// `is_admin_post` snapshots the actor's role at this instant.
    pub async fn create_post(
        &self,
        actor: &Actor,
        request: &CreatePostRequest,
    ) -> Result<Post, AppError> {
        let title = validate_title(&request.title)?;
        let content = validate_post_content(&request.content)?;

        let now = Utc::now();
        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            slug: generate_slug(&title, now),
            title,
            content,
            author_id: actor.user_id.clone(),
            is_admin_post: actor.is_admin(),
            is_pinned: false,
            status: PostStatus::Published,
            upvotes: 0,
            downvotes: 0,
            score: 0,
            hot_score: hot_score(0, now, now),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO posts (
                id, slug, title, content, author_id, is_admin_post, is_pinned, status,
                upvotes, downvotes, score, hot_score, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&post.id)
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.author_id)
        .bind(post.is_admin_post)
        .bind(post.is_pinned)
        .bind(post.status.as_str())
        .bind(post.upvotes)
        .bind(post.downvotes)
        .bind(post.score)
        .bind(post.hot_score)
        .bind(timestamp(post.created_at))
        .bind(timestamp(post.updated_at))
        .execute(&self.pool)
        .await?;

        tracing::info!(post_id = %post.id, slug = %post.slug, author_id = %post.author_id, "Post created");
        Ok(post)
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    /// Get a post by ID, falling back to slug, with the viewer's vote.
    pub async fn find_post_view(
        &self,
        id_or_slug: &str,
        viewer: Option<&str>,
    ) -> Result<Option<PostView>, AppError> {
        let sql = format!(
            "{} WHERE p.id = ? OR p.slug = ? ORDER BY (p.id = ?) DESC LIMIT 1",
            POST_VIEW_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(viewer)
            .bind(id_or_slug)
            .bind(id_or_slug)
            .bind(id_or_slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(post_view_from_row).transpose()?)
    }

    /// Views for a set of post ids, in the given order. Unknown ids are skipped.
    pub async fn post_views_by_ids(
        &self,
        ids: &[String],
        viewer: Option<&str>,
    ) -> Result<Vec<PostView>, AppError> {
        let sql = format!("{} WHERE p.id = ?", POST_VIEW_SELECT);
        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query(&sql)
                .bind(viewer)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                views.push(post_view_from_row(&row)?);
            }
        }
        Ok(views)
    }

    /// One page of published posts in the requested order.
    pub async fn list_posts(
        &self,
        query: &ListPostsQuery,
        viewer: Option<&str>,
    ) -> Result<Page<PostView>, AppError> {
        let page = PageRequest::new(query.page, query.page_size, DEFAULT_POST_PAGE_SIZE);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts p WHERE p.status = 'PUBLISHED' AND (? = 0 OR p.is_admin_post = 1)",
        )
        .bind(query.admin_only)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{} WHERE p.status = 'PUBLISHED' AND (? = 0 OR p.is_admin_post = 1) ORDER BY {} LIMIT ? OFFSET ?",
            POST_VIEW_SELECT,
            query.sort.order_by()
        );
        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(query.admin_only)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(post_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total, page))
    }

    /// Pinned published posts, newest first.
    pub async fn list_pinned_posts(&self, viewer: Option<&str>) -> Result<Vec<PostView>, AppError> {
        let sql = format!(
            "{} WHERE p.status = 'PUBLISHED' AND p.is_pinned = 1 ORDER BY p.created_at DESC",
            POST_VIEW_SELECT
        );
        let rows = sqlx::query(&sql).bind(viewer).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(post_view_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// One page of an author's published posts, newest first.
    pub async fn list_posts_by_author(
        &self,
        author_id: &str,
        page: PageRequest,
        viewer: Option<&str>,
    ) -> Result<Page<PostView>, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE author_id = ? AND status = 'PUBLISHED'",
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{} WHERE p.author_id = ? AND p.status = 'PUBLISHED' ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
            POST_VIEW_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(author_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(post_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total, page))
    }

    /// All published posts, for rebuilding the search index.
    pub async fn list_published_posts(&self) -> Result<Vec<Post>, AppError> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.status = 'PUBLISHED' ORDER BY p.created_at",
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Patch title, content, pin flag or status.
    ///
    /// Pinning and moving status backwards require admin. The slug never changes.
    pub async fn update_post(
        &self,
        id: &str,
        request: &UpdatePostRequest,
        actor: &Actor,
    ) -> Result<Post, AppError> {
        let existing = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

        ensure_can_modify(actor, &existing.author_id, "post")?;

        if request.is_pinned.is_some() && !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only admins can pin or unpin posts".to_string(),
            ));
        }

        if let Some(status) = request.status {
            if status < existing.status && !actor.is_admin() {
                return Err(AppError::Forbidden(format!(
                    "Only admins can move a post from {} back to {}",
                    existing.status.as_str(),
                    status.as_str()
                )));
            }
        }

        let title = match &request.title {
            Some(title) => validate_title(title)?,
            None => existing.title.clone(),
        };
        let content = match &request.content {
            Some(content) => validate_post_content(content)?,
            None => existing.content.clone(),
        };
        let is_pinned = request.is_pinned.unwrap_or(existing.is_pinned);
        let status = request.status.unwrap_or(existing.status);
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, is_pinned = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&content)
        .bind(is_pinned)
        .bind(status.as_str())
        .bind(timestamp(now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        tracing::info!(post_id = %id, actor = %actor.user_id, status = status.as_str(), "Post updated");

        Ok(Post {
            title,
            content,
            is_pinned,
            status,
            updated_at: now,
            ..existing
        })
    }

    /// Hard-delete a post. Comments, votes and shares go with it.
    pub async fn delete_post(&self, id: &str, actor: &Actor) -> Result<(), AppError> {
        let existing = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

        ensure_can_modify(actor, &existing.author_id, "post")?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        tracing::info!(post_id = %id, actor = %actor.user_id, "Post deleted");
        Ok(())
    }
}
