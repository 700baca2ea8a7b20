use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth;
use crate::config::Config;
use crate::error::BylineError;

/// Extractor that validates the JWT and provides the authenticated user ID.
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn my_handler(AuthUser(user_id): AuthUser) -> impl IntoResponse {
///     // user_id is the authenticated user's ID
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub i32);

fn authenticate(parts: &Parts) -> Result<i32, BylineError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BylineError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        BylineError::Unauthorized("Invalid Authorization header format".to_string())
    })?;

    // Arc<Config> is injected as a request extension by the app router.
    let config = parts
        .extensions
        .get::<Arc<Config>>()
        .ok_or_else(|| BylineError::Internal("Config not found in request".to_string()))?;

    let claims = auth::validate_token(token, &config.jwt_secret)?;

    claims
        .sub
        .parse()
        .map_err(|_| BylineError::Unauthorized("Invalid user ID in token".to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BylineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts).map(AuthUser)
    }
}

/// Optional-auth variant for endpoints that are public but behave
/// differently for a known caller (e.g. an author previewing a draft).
/// A missing or invalid token simply yields `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<i32>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(authenticate(parts).ok()))
    }
}
