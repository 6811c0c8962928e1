//! Rate limiting middleware using token bucket algorithm

use axum::{extract::Request, middleware::Next, response::Response};
use encore_common::errors::AppError;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Shared limiter plus the configured limit for error reporting
#[derive(Clone)]
pub struct ApiRateLimiter {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

/// Create a new rate limiter
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> ApiRateLimiter {
    let rps = NonZeroU32::new(requests_per_second.max(1)).unwrap();
    let burst = NonZeroU32::new(burst.max(1)).unwrap();
    let quota = Quota::per_second(rps).allow_burst(burst);

    ApiRateLimiter {
        limiter: Arc::new(RateLimiter::direct(quota)),
        requests_per_second,
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    request: Request,
    next: Next,
    limiter: ApiRateLimiter,
) -> Result<Response, AppError> {
    match limiter.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: limiter.requests_per_second,
            })
        }
    }
}
