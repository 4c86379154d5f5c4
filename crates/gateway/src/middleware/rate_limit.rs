//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use labsite_common::{config::RateLimitConfig, errors::AppError};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Shared limiter plus the configured rate, reported back on rejection
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<GlobalRateLimiter>,
    pub requests_per_second: u32,
}

/// Create a new rate limiter. Zero values are raised to one.
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<GlobalRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    Arc::new(RateLimiter::direct(quota))
}

impl RateLimitState {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            limiter: create_rate_limiter(config.requests_per_second, config.burst),
            requests_per_second: config.requests_per_second,
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    match state.limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            AppError::RateLimited {
                limit: state.requests_per_second,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_burst_exhaustion() {
        let limiter = create_rate_limiter(1, 2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let limiter = create_rate_limiter(0, 0);
        assert!(limiter.check().is_ok());
    }
}
