//! Gateway authentication and caller identity.
//!
//! The forum sits behind an identity gateway. The gateway proves itself with a
//! pre-shared key (constant-time compared) and forwards the verified user in
//! `x-user-*` headers. Handlers take an [`Actor`] (identity required) or an
//! `Option<Actor>` (anonymous allowed).

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::db::IdentityClaims;
use crate::errors::{codes, AppError, ErrorDetails, ErrorResponse};
use crate::models::{Actor, Role};
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = header_value(request.headers(), API_KEY_HEADER).or_else(|| {
        header_value(request.headers(), header::AUTHORIZATION.as_str())
            .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string))
    });

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing API key"),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHENTICATED.to_string(),
            message: message.to_string(),
            details: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

fn header_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build the actor for a request, upserting the user row.
///
/// The effective role is the highest of the gateway's role claim, the stored
/// role, and the admin email allow-list. Allow-list hits are persisted.
async fn resolve_actor(parts: &Parts, state: &AppState) -> Result<Option<Actor>, AppError> {
    let Some(user_id) = header_value(&parts.headers, USER_ID_HEADER) else {
        return Ok(None);
    };

    let email = header_value(&parts.headers, USER_EMAIL_HEADER);
    let claimed_role = header_value(&parts.headers, USER_ROLE_HEADER)
        .and_then(|r| Role::parse(&r))
        .unwrap_or(Role::User);
    let allow_listed = email
        .as_deref()
        .is_some_and(|e| state.config.is_admin_email(e));

    let claims = IdentityClaims {
        user_id,
        email,
        name: header_value(&parts.headers, USER_NAME_HEADER),
        promote: allow_listed,
    };
    let user = state.repo.upsert_user(&claims).await?;

    Ok(Some(Actor {
        user_id: user.id,
        role: claimed_role.max(user.role),
    }))
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_actor(parts, state).await?.ok_or_else(|| {
            AppError::Unauthenticated("Missing caller identity".to_string())
        })
    }
}

impl OptionalFromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve_actor(parts, state).await
    }
}
