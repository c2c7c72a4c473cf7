//! Database repository shared by the post, comment, vote, user and share operations.
//!
//! Uses prepared statements and transactions for data integrity.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Actor, Comment, CommentView, Post, PostStatus, PostView, Role, User};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Fail with `Forbidden` unless the actor authored the entity or is an admin.
pub(super) fn ensure_can_modify(actor: &Actor, author_id: &str, what: &str) -> Result<(), AppError> {
    if actor.can_modify(author_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not allowed to modify this {}",
            what
        )))
    }
}

// Column lists and row conversion

pub(super) const POST_COLUMNS: &str = "p.id, p.slug, p.title, p.content, p.author_id, \
     p.is_admin_post, p.is_pinned, p.status, p.upvotes, p.downvotes, p.score, p.hot_score, \
     p.created_at, p.updated_at";

/// Post columns plus author name, comment count, and the vote of the user bound to the first `?`.
pub(super) const POST_VIEW_SELECT: &str = "SELECT p.id, p.slug, p.title, p.content, p.author_id, \
     p.is_admin_post, p.is_pinned, p.status, p.upvotes, p.downvotes, p.score, p.hot_score, \
     p.created_at, p.updated_at, u.name AS author_name, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
     COALESCE(v.value, 0) AS user_vote \
     FROM posts p \
     LEFT JOIN users u ON u.id = p.author_id \
     LEFT JOIN votes v ON v.post_id = p.id AND v.user_id = ?";

pub(super) const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.parent_id, c.author_id, c.content, \
     c.depth, c.upvotes, c.downvotes, c.score, c.created_at, c.updated_at";

pub(super) fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role: Role::parse(&role)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown role {}", role).into()))?,
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Post {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        is_admin_post: row.try_get("is_admin_post")?,
        is_pinned: row.try_get("is_pinned")?,
        status: PostStatus::parse(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown post status {}", status).into()))?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        score: row.try_get("score")?,
        hot_score: row.try_get("hot_score")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn post_view_from_row(row: &SqliteRow) -> Result<PostView, sqlx::Error> {
    Ok(PostView {
        post: post_from_row(row)?,
        author_name: row.try_get("author_name")?,
        comment_count: row.try_get("comment_count")?,
        user_vote: row.try_get("user_vote")?,
    })
}

pub(super) fn comment_from_row(row: &SqliteRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        parent_id: row.try_get("parent_id")?,
        author_id: row.try_get("author_id")?,
        content: row.try_get("content")?,
        depth: row.try_get("depth")?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        score: row.try_get("score")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn comment_view_from_row(row: &SqliteRow) -> Result<CommentView, sqlx::Error> {
    Ok(CommentView {
        comment: comment_from_row(row)?,
        author_name: row.try_get("author_name")?,
        user_vote: row.try_get("user_vote")?,
    })
}
