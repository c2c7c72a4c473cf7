//! Comment threads.

use chrono::Utc;

use super::repository::{
    comment_from_row, comment_view_from_row, ensure_can_modify, Repository, COMMENT_COLUMNS,
};
use super::timestamp;
use crate::errors::AppError;
use crate::models::{
    assemble_forest, reply_depth, validate_comment_content, Actor, Comment, CommentNode,
    CommentView, CreateCommentRequest, ListCommentsQuery, Page, PageRequest,
};

const DEFAULT_COMMENT_PAGE_SIZE: u32 = 50;

impl Repository {
    /// Add a top-level comment or a reply on `post_id`.
    pub async fn create_comment(
        &self,
        actor: &Actor,
        post_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        let post_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        if post_exists.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let depth = match request.parent_id.as_deref() {
            None => 0,
            Some(parent_id) => {
                let parent = self.get_comment(parent_id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Parent comment {} not found", parent_id))
                })?;
                if parent.post_id != post_id {
                    return Err(AppError::Validation(
                        "Parent comment belongs to a different post".to_string(),
                    ));
                }
                reply_depth(parent.depth)?
            }
        };
        let content = validate_comment_content(&request.content)?;

        let now = Utc::now();
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            parent_id: request.parent_id.clone(),
            author_id: actor.user_id.clone(),
            content,
            depth,
            upvotes: 0,
            downvotes: 0,
            score: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO comments (
                id, post_id, parent_id, author_id, content, depth,
                upvotes, downvotes, score, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)"#,
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.parent_id)
        .bind(&comment.author_id)
        .bind(&comment.content)
        .bind(comment.depth)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            depth = comment.depth,
            "Comment created"
        );
        Ok(comment)
    }

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let sql = format!("SELECT {} FROM comments c WHERE c.id = ?", COMMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(comment_from_row).transpose()?)
    }

    /// Get a comment with author name and the viewer's vote.
    pub async fn get_comment_view(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> Result<Option<CommentView>, AppError> {
        let sql = format!(
            "SELECT {}, u.name AS author_name, COALESCE(v.value, 0) AS user_vote \
             FROM comments c \
             LEFT JOIN users u ON u.id = c.author_id \
             LEFT JOIN votes v ON v.comment_id = c.id AND v.user_id = ? \
             WHERE c.id = ?",
            COMMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(comment_view_from_row).transpose()?)
    }

    /// One page of top-level comments on a post, each with its full reply tree.
    ///
    /// `total` counts top-level comments only.
    pub async fn list_comments(
        &self,
        post_id: &str,
        query: &ListCommentsQuery,
        viewer: Option<&str>,
    ) -> Result<Page<CommentNode>, AppError> {
        let post_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        if post_exists.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let page = PageRequest::new(query.page, query.page_size, DEFAULT_COMMENT_PAGE_SIZE);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = ? AND parent_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "WITH RECURSIVE roots AS ( \
                 SELECT id FROM comments WHERE post_id = ? AND parent_id IS NULL \
                 ORDER BY {} LIMIT ? OFFSET ? \
             ), \
             thread(id) AS ( \
                 SELECT id FROM roots \
                 UNION ALL \
                 SELECT c.id FROM comments c JOIN thread t ON c.parent_id = t.id \
             ) \
             SELECT {}, u.name AS author_name, COALESCE(v.value, 0) AS user_vote \
             FROM comments c \
             JOIN thread t ON t.id = c.id \
             LEFT JOIN users u ON u.id = c.author_id \
             LEFT JOIN votes v ON v.comment_id = c.id AND v.user_id = ?",
            query.sort.root_order_by(),
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .bind(page.limit())
            .bind(page.offset())
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;

        let views = rows
            .iter()
            .map(comment_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(assemble_forest(views, query.sort), total, page))
    }

    /// Replace a comment's content. Position in the thread never changes.
    pub async fn update_comment(
        &self,
        id: &str,
        content: &str,
        actor: &Actor,
    ) -> Result<Comment, AppError> {
        let existing = self
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        ensure_can_modify(actor, &existing.author_id, "comment")?;
        let content = validate_comment_content(content)?;
        let now = Utc::now();

        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(&content)
            .bind(timestamp(now))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        tracing::info!(comment_id = %id, actor = %actor.user_id, "Comment updated");

        Ok(Comment {
            content,
            updated_at: now,
            ..existing
        })
    }

    /// Hard-delete a comment and its whole reply subtree.
    pub async fn delete_comment(&self, id: &str, actor: &Actor) -> Result<(), AppError> {
        let existing = self
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        ensure_can_modify(actor, &existing.author_id, "comment")?;

        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        tracing::info!(comment_id = %id, post_id = %existing.post_id, actor = %actor.user_id, "Comment deleted");
        Ok(())
    }
}
