//! # Middleware Module
//!
//! Global rate limiting for the HTTP API.
//!
//! `KOZA_RATE_LIMIT` sets the requests per second across all clients
//! (default 100, `0` disables the limiter).

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Requests per second when `KOZA_RATE_LIMIT` is unset or unparsable.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(DEFAULT_RATE_LIMIT) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Process-wide rate limiter shared by every route.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// A limiter allowing `requests_per_second` (0 falls back to the default).
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// `KOZA_RATE_LIMIT`, or the default if unset or not a number.
pub fn get_rate_limit_from_env() -> u32 {
    parse_rate_limit(std::env::var("KOZA_RATE_LIMIT").ok().as_deref())
}

fn parse_rate_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

/// Reject with 429 once the global quota is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if limiter.check().is_ok() {
        return Ok(next.run(request).await);
    }
    tracing::warn!(
        event = "rate_limited",
        path = request.uri().path(),
        "Rate limit exceeded"
    );
    Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
}

// =============================================================================
// TESTS
// =============================================================================
