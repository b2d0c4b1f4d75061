//! # Authentication Module
//!
//! Optional API key authentication. When `KOZA_API_KEY` is set, every route
//! except `/health` requires the key in one of:
//!
//! ```text
//! Authorization: Bearer <key>
//! x-api-key: <key>
//! ```
//!
//! Sensor agents on microcontrollers usually send the plain header; the
//! dashboard sends the bearer form.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Alternative header carrying the raw key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Routes reachable without a key.
const PUBLIC_PATHS: [&str; 1] = ["/health"];

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// `KOZA_API_KEY` if set and non-empty; `None` disables authentication.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("KOZA_API_KEY").ok().filter(|k| !k.is_empty())
}

/// The key presented by the client. A bearer token wins over `x-api-key`;
/// any other `Authorization` scheme (e.g. a proxy's `Basic`) is ignored.
fn provided_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim());
    }
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Constant-time key comparison.
///
/// Both sides are zero-padded to the same length so `ct_eq` always runs over
/// the same number of bytes; the length check comes after.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let failure = match provided_key(request.headers()) {
        Some(key) if keys_match(key, &expected) => None,
        Some(_) => Some("invalid_api_key"),
        None => Some("missing_api_key"),
    };

    match failure {
        None => Ok(next.run(request).await),
        Some(reason) => {
            tracing::warn!(
                event = "auth_failure",
                reason,
                path = request.uri().path(),
                "Authentication failed"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
