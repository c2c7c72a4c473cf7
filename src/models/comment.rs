//! Comment model and forest assembly.
//!
//! Comments are stored flat with a `parent_id` back-reference. The nested view
//! is rebuilt per request by grouping rows under their parent id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::post::validate_text;
use crate::errors::AppError;

/// Deepest allowed reply level; top-level comments have depth 0.
pub const MAX_COMMENT_DEPTH: i64 = 6;
pub const MAX_COMMENT_CHARS: usize = 10_000;

/// A reply to a post or to another comment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub content: String,
    pub depth: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment with author and caller context, as stored in the flat arena.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Caller's vote: 1, -1, or 0
    pub user_vote: i64,
}

/// A comment with its replies attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub view: CommentView,
    pub replies: Vec<CommentNode>,
}

/// Ordering for comment threads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    /// Newest top-level comments first, replies oldest first
    #[default]
    New,
    /// Highest score first at every level
    Top,
}

impl CommentSort {
    /// ORDER BY clause for top-level comments.
    pub fn root_order_by(&self) -> &'static str {
        match self {
            CommentSort::New => "created_at DESC",
            CommentSort::Top => "score DESC, created_at DESC",
        }
    }
}

/// Request body for creating a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request body for editing a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// Query parameters for comment listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    #[serde(default)]
    pub sort: CommentSort,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "limit")]
    pub page_size: Option<u32>,
}

/// Trimmed, length-checked comment body.
pub fn validate_comment_content(content: &str) -> Result<String, AppError> {
    validate_text("Content", content, MAX_COMMENT_CHARS)
}

/// Depth of a reply under a parent at `parent_depth`.
pub fn reply_depth(parent_depth: i64) -> Result<i64, AppError> {
    let depth = parent_depth + 1;
    if depth > MAX_COMMENT_DEPTH {
        return Err(AppError::Validation(format!(
            "Maximum comment depth of {} exceeded",
            MAX_COMMENT_DEPTH
        )));
    }
    Ok(depth)
}

/// Rebuild the forest from a flat set of comments.
///
/// Rows whose parent is not in the set are dropped.
pub fn assemble_forest(comments: Vec<CommentView>, sort: CommentSort) -> Vec<CommentNode> {
    let mut children: HashMap<Option<String>, Vec<CommentView>> = HashMap::new();
    for view in comments {
        children
            .entry(view.comment.parent_id.clone())
            .or_default()
            .push(view);
    }

    let mut roots = children.remove(&None).unwrap_or_default();
    roots.sort_by(|a, b| compare_roots(&a.comment, &b.comment, sort));

    roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children, sort))
        .collect()
}

fn attach_replies(
    view: CommentView,
    children: &mut HashMap<Option<String>, Vec<CommentView>>,
    sort: CommentSort,
) -> CommentNode {
    let mut replies = children
        .remove(&Some(view.comment.id.clone()))
        .unwrap_or_default();
    replies.sort_by(|a, b| compare_replies(&a.comment, &b.comment, sort));

    let replies = replies
        .into_iter()
        .map(|reply| attach_replies(reply, children, sort))
        .collect();

    CommentNode { view, replies }
}

fn compare_roots(a: &Comment, b: &Comment, sort: CommentSort) -> std::cmp::Ordering {
    match sort {
        CommentSort::New => b.created_at.cmp(&a.created_at),
        CommentSort::Top => b
            .score
            .cmp(&a.score)
            .then_with(|| b.created_at.cmp(&a.created_at)),
    }
}

fn compare_replies(a: &Comment, b: &Comment, sort: CommentSort) -> std::cmp::Ordering {
    match sort {
        CommentSort::New => a.created_at.cmp(&b.created_at),
        CommentSort::Top => b
            .score
            .cmp(&a.score)
            .then_with(|| a.created_at.cmp(&b.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    // Every comment id in a forest, depth first
    fn forest_ids(nodes: &[CommentNode]) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack: Vec<&CommentNode> = nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.view.comment.id.as_str());
            stack.extend(node.replies.iter().rev());
        }
        ids
    }

    fn view(id: &str, parent: Option<&str>, depth: i64, minute: i64, score: i64) -> CommentView {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        CommentView {
            comment: Comment {
                id: id.to_string(),
                post_id: "p1".to_string(),
                parent_id: parent.map(str::to_string),
                author_id: "u1".to_string(),
                content: format!("comment {}", id),
                depth,
                upvotes: score.max(0),
                downvotes: (-score).max(0),
                score,
                created_at: at,
                updated_at: at,
            },
            author_name: None,
            user_vote: 0,
        }
    }

    #[test]
    fn test_reply_depth_limit() {
        assert_eq!(reply_depth(0).unwrap(), 1);
        assert_eq!(reply_depth(5).unwrap(), 6);
        assert!(matches!(reply_depth(6), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_forest_new_ordering() {
        let rows = vec![
            view("r1", None, 0, 0, 0),
            view("r2", None, 0, 5, 0),
            view("a", Some("r1"), 1, 3, 0),
            view("b", Some("r1"), 1, 1, 0),
            view("a1", Some("a"), 2, 4, 0),
        ];

        let forest = assemble_forest(rows, CommentSort::New);

        // Newest root first, oldest reply first
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].view.comment.id, "r2");
        assert_eq!(forest[1].view.comment.id, "r1");
        let replies: Vec<&str> = forest[1]
            .replies
            .iter()
            .map(|n| n.view.comment.id.as_str())
            .collect();
        assert_eq!(replies, vec!["b", "a"]);
        assert_eq!(forest[1].replies[1].replies[0].view.comment.id, "a1");
        assert_eq!(forest_ids(&forest), vec!["r2", "r1", "b", "a", "a1"]);
    }

    #[test]
    fn test_forest_top_ordering() {
        let rows = vec![
            view("low", None, 0, 0, -1),
            view("high", None, 0, 1, 9),
            view("x", Some("high"), 1, 2, 1),
            view("y", Some("high"), 1, 3, 4),
        ];

        let forest = assemble_forest(rows, CommentSort::Top);

        assert_eq!(forest[0].view.comment.id, "high");
        assert_eq!(forest[0].replies[0].view.comment.id, "y");
        assert_eq!(forest[1].view.comment.id, "low");
    }

    #[test]
    fn test_orphans_are_dropped() {
        let rows = vec![view("r", None, 0, 0, 0), view("o", Some("gone"), 1, 1, 0)];
        let forest = assemble_forest(rows, CommentSort::New);
        assert_eq!(forest_ids(&forest), vec!["r"]);
    }

    #[test]
    fn test_comment_content_validation() {
        assert_eq!(validate_comment_content("  ok ").unwrap(), "ok");
        assert!(validate_comment_content("").is_err());
        assert!(validate_comment_content(&"z".repeat(10_001)).is_err());
    }
}
