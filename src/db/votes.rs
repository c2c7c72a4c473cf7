//! Vote ledger and score aggregation.
//!
//! A cast runs in one transaction:
//! 1. write-lock the target row (also the existence check),
//! 2. read the caller's stored vote and resolve the transition,
//! 3. apply it against the (user, target) uniqueness constraint,
//! 4. recompute the target's counters from the vote rows.
//!
//! Counters are never incremented in place, so a failed or interleaved write
//! cannot leave them drifting from the vote rows.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use super::repository::Repository;
use super::timestamp;
use crate::errors::AppError;
use crate::models::{vote_state_value, VoteResult, VoteTally, VoteTarget, VoteTransition, VoteValue};
use crate::ranking::hot_score;

/// Column on `votes` that references the target.
fn target_column(target: &VoteTarget) -> &'static str {
    match target {
        VoteTarget::Post(_) => "post_id",
        VoteTarget::Comment(_) => "comment_id",
    }
}

fn not_found(target: &VoteTarget) -> AppError {
    match target {
        VoteTarget::Post(id) => AppError::NotFound(format!("Post {} not found", id)),
        VoteTarget::Comment(id) => AppError::NotFound(format!("Comment {} not found", id)),
    }
}

impl Repository {
    /// Apply one click of `value` by `user_id` on `target`.
    pub async fn cast_vote(
        &self,
        user_id: &str,
        target: &VoteTarget,
        value: VoteValue,
    ) -> Result<VoteResult, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        lock_target(&mut tx, target).await?;

        let current = stored_vote(&mut tx, user_id, target).await?;
        let transition = VoteTransition::resolve(current, value);

        match transition {
            VoteTransition::Insert(v) | VoteTransition::Flip(v) => {
                upsert_vote(&mut tx, user_id, target, v, now).await?;
            }
            VoteTransition::Remove => {
                delete_vote(&mut tx, user_id, target).await?;
            }
        }

        let tally = recompute_in(&mut tx, target, now).await?;
        tx.commit().await?;

        tracing::debug!(
            user_id,
            target = target.kind(),
            target_id = target.id(),
            transition = ?transition,
            score = tally.score(),
            "Vote cast"
        );

        Ok(VoteResult {
            previous_value: vote_state_value(current),
            new_value: vote_state_value(transition.next_state()),
            new_score: tally.score(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
        })
    }

    /// Re-derive a target's counters (and a post's hot score) from its vote rows.
    pub async fn recompute_score(&self, target: &VoteTarget) -> Result<VoteTally, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_target(&mut tx, target).await?;
        let tally = recompute_in(&mut tx, target, Utc::now()).await?;
        tx.commit().await?;
        Ok(tally)
    }

    /// The caller's stored vote on a target, if any.
    pub async fn get_vote(
        &self,
        user_id: &str,
        target: &VoteTarget,
    ) -> Result<Option<VoteValue>, AppError> {
        let mut conn = self.pool.acquire().await?;
        stored_vote(&mut conn, user_id, target).await
    }

    /// Recompute every post's hot score against a single `now`.
    pub async fn refresh_hot_scores(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the lock before it reads
        sqlx::query("UPDATE posts SET hot_score = hot_score")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("SELECT id, score, created_at FROM posts")
            .fetch_all(&mut *tx)
            .await?;

        let mut updated = 0;
        for row in &rows {
            let id: String = row.try_get("id")?;
            let score: i64 = row.try_get("score")?;
            let created_at: DateTime<Utc> = row.try_get("created_at")?;

            updated += sqlx::query("UPDATE posts SET hot_score = ? WHERE id = ?")
                .bind(hot_score(score, created_at, now))
                .bind(&id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;

        tracing::info!(posts = updated, "Hot scores refreshed");
        Ok(updated)
    }
}

/// Touch the target row so this transaction holds the write lock from its first statement.
async fn lock_target(conn: &mut SqliteConnection, target: &VoteTarget) -> Result<(), AppError> {
    let sql = match target {
        VoteTarget::Post(_) => "UPDATE posts SET upvotes = upvotes WHERE id = ?",
        VoteTarget::Comment(_) => "UPDATE comments SET upvotes = upvotes WHERE id = ?",
    };

    let result = sqlx::query(sql).bind(target.id()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(not_found(target));
    }
    Ok(())
}

async fn stored_vote(
    conn: &mut SqliteConnection,
    user_id: &str,
    target: &VoteTarget,
) -> Result<Option<VoteValue>, AppError> {
    let sql = format!(
        "SELECT value FROM votes WHERE user_id = ? AND {} = ?",
        target_column(target)
    );

    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(target.id())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        None => Ok(None),
        Some(row) => {
            let value: i64 = row.try_get("value")?;
            VoteValue::from_stored(value)
                .map(Some)
                .ok_or_else(|| AppError::Internal(format!("Stored vote has value {}", value)))
        }
    }
}

/// Insert the vote, or overwrite it in place if a row for (user, target) exists.
async fn upsert_vote(
    conn: &mut SqliteConnection,
    user_id: &str,
    target: &VoteTarget,
    value: VoteValue,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let column = target_column(target);
    let sql = format!(
        "INSERT INTO votes (id, user_id, {column}, value, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, {column}) DO UPDATE SET \
             value = excluded.value, updated_at = excluded.updated_at"
    );
    let now = timestamp(now);

    sqlx::query(&sql)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(target.id())
        .bind(value.as_i64())
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn delete_vote(
    conn: &mut SqliteConnection,
    user_id: &str,
    target: &VoteTarget,
) -> Result<(), AppError> {
    let sql = format!(
        "DELETE FROM votes WHERE user_id = ? AND {} = ?",
        target_column(target)
    );

    sqlx::query(&sql)
        .bind(user_id)
        .bind(target.id())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Count the target's vote rows and persist upvotes, downvotes, score
/// (and for posts, hot score) in one statement.
pub(super) async fn recompute_in(
    conn: &mut SqliteConnection,
    target: &VoteTarget,
    now: DateTime<Utc>,
) -> Result<VoteTally, AppError> {
    let sql = format!(
        "SELECT COALESCE(SUM(CASE WHEN value = 1 THEN 1 ELSE 0 END), 0) AS upvotes, \
                COALESCE(SUM(CASE WHEN value = -1 THEN 1 ELSE 0 END), 0) AS downvotes \
         FROM votes WHERE {} = ?",
        target_column(target)
    );

    let row = sqlx::query(&sql)
        .bind(target.id())
        .fetch_one(&mut *conn)
        .await?;

    let tally = VoteTally {
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
    };

    match target {
        VoteTarget::Post(id) => {
            let created_at: DateTime<Utc> =
                sqlx::query_scalar("SELECT created_at FROM posts WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| not_found(target))?;

            sqlx::query(
                "UPDATE posts SET upvotes = ?, downvotes = ?, score = ?, hot_score = ? WHERE id = ?",
            )
            .bind(tally.upvotes)
            .bind(tally.downvotes)
            .bind(tally.score())
            .bind(hot_score(tally.score(), created_at, now))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        VoteTarget::Comment(id) => {
            sqlx::query("UPDATE comments SET upvotes = ?, downvotes = ?, score = ? WHERE id = ?")
                .bind(tally.upvotes)
                .bind(tally.downvotes)
                .bind(tally.score())
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(tally)
}
