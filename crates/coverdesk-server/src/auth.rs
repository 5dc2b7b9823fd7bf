use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use moka::future::Cache;
use sha2::{Digest, Sha256};

use coverdesk_core::traits::IdentityLookup;
use coverdesk_core::{AppError, AuthUser};

use crate::dto::ErrorResponse;
use crate::error::ApiError;
use crate::state::AppState;

pub const ADMIN_REQUIRED: &str = "Access denied. Admin privileges required.";

const MAX_CACHED_TOKENS: u64 = 10_000;

/// Short-lived cache of verified bearer tokens, keyed by the token's SHA-256.
#[derive(Clone)]
pub struct AdminCache {
    inner: Option<Cache<String, AuthUser>>,
}

impl AdminCache {
    /// A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        Self {
            inner: Some(
                Cache::builder()
                    .max_capacity(MAX_CACHED_TOKENS)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub async fn get(&self, token: &str) -> Option<AuthUser> {
        self.inner.as_ref()?.get(&token_key(token)).await
    }

    pub async fn insert(&self, token: &str, user: AuthUser) {
        if let Some(cache) = &self.inner {
            cache.insert(token_key(token), user).await;
        }
    }
}

fn token_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn reject(status: StatusCode, error: &str, message: &str) -> Response {
    (status, axum::Json(ErrorResponse::new(error, message))).into_response()
}

/// Middleware that resolves `Authorization: Bearer <access_token>` through the
/// auth backend and only lets admins through. The resolved [`AuthUser`] is
/// stored in the request extensions.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Missing or invalid Authorization header. Expected: Bearer <access_token>",
        );
    };

    let Some(auth) = state.auth.as_ref() else {
        return reject(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Admin endpoints are disabled: no auth backend configured",
        );
    };

    let user = match state.admin_cache.get(&token).await {
        Some(user) => user,
        None => match auth.get_user(&token).await {
            Ok(user) => {
                state.admin_cache.insert(&token, user.clone()).await;
                user
            }
            Err(AppError::AuthError(_)) => {
                return reject(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Invalid or expired access token",
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token lookup failed");
                return ApiError(e).into_response();
            }
        },
    };

    if !user.is_admin() {
        tracing::info!(user_id = %user.id, "Non-admin request to admin endpoint");
        return reject(StatusCode::FORBIDDEN, "forbidden", ADMIN_REQUIRED);
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}
