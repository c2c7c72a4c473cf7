//! Post model, request bodies, and slug derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_POST_CONTENT_CHARS: usize = 50_000;
const MAX_SLUG_BASE_CHARS: usize = 100;

/// Lifecycle status of a post. Ordered by lifecycle position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
            PostStatus::Archived => "ARCHIVED",
            PostStatus::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(PostStatus::Draft),
            "PUBLISHED" => Some(PostStatus::Published),
            "ARCHIVED" => Some(PostStatus::Archived),
            "DELETED" => Some(PostStatus::Deleted),
            _ => None,
        }
    }
}

/// Sort order for post listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Hot,
    New,
    Top,
}

impl SortMode {
    /// ORDER BY clause over the `posts` table aliased as `p`.
    pub fn order_by(&self) -> &'static str {
        match self {
            SortMode::Hot => "p.hot_score DESC, p.created_at DESC",
            SortMode::New => "p.created_at DESC",
            SortMode::Top => "p.score DESC, p.created_at DESC",
        }
    }
}

/// A top-level discussion post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub is_admin_post: bool,
    pub is_pinned: bool,
    pub status: PostStatus,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub hot_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post as returned to callers, with author and caller context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub comment_count: i64,
    /// Caller's vote: 1, -1, or 0
    pub user_vote: i64,
}

/// Request body for creating a new post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

/// Request body for updating an existing post. Slug is not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// Query parameters for post listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "limit")]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub admin_only: bool,
}

/// Trimmed, length-checked post title.
pub fn validate_title(title: &str) -> Result<String, AppError> {
    validate_text("Title", title, MAX_TITLE_CHARS)
}

/// Trimmed, length-checked post body.
pub fn validate_post_content(content: &str) -> Result<String, AppError> {
    validate_text("Content", content, MAX_POST_CONTENT_CHARS)
}

pub(crate) fn validate_text(field: &str, value: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

/// URL-safe slug derived from a title, without the uniqueness suffix.
pub fn slug_base(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = !slug.is_empty();
        } else if c.is_ascii_alphanumeric() || is_hangul_syllable(c) {
            if pending_dash {
                slug.push('-');
                pending_dash = false;
            }
            slug.push(c);
        }
    }

    let truncated: String = slug.chars().take(MAX_SLUG_BASE_CHARS).collect();
    let truncated = truncated.trim_end_matches('-');
    if truncated.is_empty() {
        "post".to_string()
    } else {
        truncated.to_string()
    }
}

/// Slug for a new post: the title base plus a time-and-random token.
pub fn generate_slug(title: &str, now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}{}", slug_base(title), to_base36(millis), &random[..6])
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_base_normalizes() {
        assert_eq!(slug_base("Hello, World!"), "hello-world");
        assert_eq!(slug_base("  Rust --  is   great  "), "rust-is-great");
        assert_eq!(slug_base("C++ & Rust: 2024?"), "c-rust-2024");
        assert_eq!(slug_base("오늘의 토론 주제"), "오늘의-토론-주제");
        assert_eq!(slug_base("!!!"), "post");
    }

    #[test]
    fn test_slug_base_truncates() {
        let long = "a".repeat(500);
        assert_eq!(slug_base(&long).chars().count(), 100);

        // The 100th character would be the separator
        let dashed = format!("{} b", "a".repeat(99));
        assert_eq!(slug_base(&dashed), "a".repeat(99));
    }

    #[test]
    fn test_identical_titles_get_distinct_slugs() {
        let now = Utc::now();
        let a = generate_slug("Same Title", now);
        let b = generate_slug("Same Title", now);
        assert_ne!(a, b);
        assert!(a.starts_with("same-title-"));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_text_validation() {
        assert_eq!(validate_title("  hi  ").unwrap(), "hi");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(301)).is_err());
        assert!(validate_title(&"x".repeat(300)).is_ok());
        assert!(validate_post_content(&"y".repeat(50_001)).is_err());
    }

    #[test]
    fn test_status_order() {
        assert!(PostStatus::Draft < PostStatus::Published);
        assert!(PostStatus::Published < PostStatus::Archived);
        assert!(PostStatus::Archived < PostStatus::Deleted);
        assert_eq!(PostStatus::parse("ARCHIVED"), Some(PostStatus::Archived));
    }
}
