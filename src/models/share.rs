//! Share event model.

use serde::{Deserialize, Serialize};

/// Where a post was shared to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SharePlatform {
    Twitter,
    Facebook,
    Linkedin,
    Copy,
    Other,
}

impl SharePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharePlatform::Twitter => "twitter",
            SharePlatform::Facebook => "facebook",
            SharePlatform::Linkedin => "linkedin",
            SharePlatform::Copy => "copy",
            SharePlatform::Other => "other",
        }
    }
}

/// Request body for recording a share.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    pub platform: SharePlatform,
}

/// Number of recorded shares for a post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCount {
    pub post_id: String,
    pub shares: i64,
}
