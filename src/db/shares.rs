//! Share events.

use chrono::Utc;

use super::repository::Repository;
use super::timestamp;
use crate::errors::AppError;
use crate::models::SharePlatform;

impl Repository {
    /// Record that a post was shared. Append-only.
    pub async fn record_share(
        &self,
        post_id: &str,
        platform: SharePlatform,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO shares (id, post_id, platform, created_at) VALUES (?, ?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(post_id)
            .bind(platform.as_str())
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        tracing::debug!(post_id, platform = platform.as_str(), "Share recorded");
        Ok(())
    }

    /// Number of shares recorded for a post.
    pub async fn count_shares(&self, post_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM shares WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
