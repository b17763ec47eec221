use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Whether a stored password value is a complete Argon2 PHC string.
///
/// `PasswordHash::new` accepts strings without a salt or output, so both are
/// checked explicitly.
pub fn is_password_hashed(stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => {
            parsed.algorithm.as_str().starts_with("argon2")
                && parsed.salt.is_some()
                && parsed.hash.is_some()
        }
        Err(_) => false,
    }
}

/// Extract the bearer token or `X-API-Key` value from request headers
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        return Some(auth_header.strip_prefix("Bearer ").unwrap_or(auth_header));
    }

    headers.get("X-API-Key").and_then(|h| h.to_str().ok())
}

fn token_matches(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    expected.len() == provided.len() && expected.ct_eq(provided).into()
}

/// Reject requests that do not carry the configured admin token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    if !token_matches(&state.config.auth.admin_token, token) {
        tracing::debug!(path = %request.uri().path(), "Rejected request with invalid token");
        return Err(ApiError::unauthorized("Invalid authentication token"));
    }

    Ok(next.run(request).await)
}
