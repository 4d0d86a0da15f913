/// Rate Limiting System
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paths guarded by the strict credential limiter
const CREDENTIAL_PATHS: [&str; 2] = ["/api/auth/login", "/api/bot/register"];

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    general: Arc<DirectLimiter>,
    credentials: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let general_quota = Quota::per_second(rps).allow_burst(rps.saturating_mul(
            NonZeroU32::new(2).unwrap_or(NonZeroU32::MIN),
        ));

        let per_minute =
            NonZeroU32::new(config.login_attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        let credential_quota = Quota::per_minute(per_minute);

        Self {
            enabled: config.enabled,
            general: Arc::new(GovernorLimiter::direct(general_quota)),
            credentials: Arc::new(GovernorLimiter::direct(credential_quota)),
        }
    }

    /// Check the limiter for any request
    pub fn check_general(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.general.check().map_err(|_| AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }

    /// Check the limiter for login and bot registration attempts
    pub fn check_credentials(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.credentials
            .check()
            .map_err(|_| AppError::RateLimitExceeded {
                retry_after: Duration::from_secs(60),
            })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();

    if CREDENTIAL_PATHS.contains(&path) {
        ctx.rate_limiter.check_credentials()?;
    }
    if path != "/health" && path != "/metrics" {
        ctx.rate_limiter.check_general().map_err(|e| {
            tracing::warn!(path, "General rate limit exceeded");
            e
        })?;
    }

    Ok(next.run(request).await)
}
