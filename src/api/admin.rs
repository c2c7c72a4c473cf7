//! Admin maintenance endpoints.

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::Actor;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub updated: u64,
}

/// POST /api/admin/hot-scores/refresh - Recompute every post's hot score now.
pub async fn refresh_hot_scores(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<RefreshResponse> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can refresh hot scores".to_string(),
        ));
    }

    let updated = state.repo.refresh_hot_scores(Utc::now()).await?;
    success(RefreshResponse { updated })
}
