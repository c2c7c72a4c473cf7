//! User operations.

use chrono::Utc;

use super::repository::{user_from_row, Repository};
use super::timestamp;
use crate::errors::AppError;
use crate::models::{Role, User};

/// Identity fields supplied by the upstream identity provider.
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Persist an ADMIN role, e.g. for allow-listed emails.
    pub promote: bool,
}

impl Repository {
    /// Create the user on first sight, refresh profile fields otherwise.
    ///
    /// The stored role only ever moves to ADMIN here; demotion is explicit.
    pub async fn upsert_user(&self, claims: &IdentityClaims) -> Result<User, AppError> {
        let now = timestamp(Utc::now());
        let role = if claims.promote { Role::Admin } else { Role::User };

        let row = sqlx::query(
            r#"INSERT INTO users (id, email, name, role, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   email = COALESCE(excluded.email, users.email),
                   name = COALESCE(excluded.name, users.name),
                   role = CASE WHEN excluded.role = 'ADMIN' THEN 'ADMIN' ELSE users.role END,
                   updated_at = excluded.updated_at
               RETURNING id, email, name, role, created_at"#,
        )
        .bind(&claims.user_id)
        .bind(claims.email.as_deref().map(str::to_lowercase))
        .bind(&claims.name)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row)?)
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, email, name, role, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    /// Set a user's role. Existing posts keep their `is_admin_post` snapshot.
    pub async fn update_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        let row = sqlx::query(
            "UPDATE users SET role = ?, updated_at = ? WHERE id = ? RETURNING id, email, name, role, created_at",
        )
        .bind(role.as_str())
        .bind(timestamp(Utc::now()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let user = row
            .as_ref()
            .map(user_from_row)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User role changed");
        Ok(user)
    }
}
