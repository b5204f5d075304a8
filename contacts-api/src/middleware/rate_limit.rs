/// Per-user rate limiting
///
/// Fixed-window counters kept in Redis. Each protected route group has a
/// [`RateLimit`] of `times` requests per `seconds`, counted per
/// authenticated user. The profile endpoint allows 5 requests per minute.
///
/// # Algorithm
///
/// One Lua script runs atomically per request:
///
/// ```lua
/// local current = redis.call('INCR', KEYS[1])
/// if current == 1 then
///     redis.call('EXPIRE', KEYS[1], ARGV[1])
/// end
/// local ttl = redis.call('TTL', KEYS[1])
/// return {current, ttl}
/// ```
///
/// The first request opens the window and sets its expiry; the window
/// closes when the key expires.
///
/// # Storage
///
/// Keys: `ratelimit:{scope}:user:{user_id}`, expiring with the window.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `Retry-After`: seconds until the window closes (429 responses only)
///
/// Without a configured Redis, or if Redis fails mid-request, requests are
/// let through and a warning is logged.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Extension, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use contacts_shared::auth::middleware::AuthContext;
use contacts_shared::redis::{RedisClient, RedisClientError};

/// Allowed request rate for a route group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed per window
    pub times: u32,

    /// Window length in seconds
    pub seconds: u64,
}

impl RateLimit {
    pub const fn new(times: u32, seconds: u64) -> Self {
        Self { times, seconds }
    }

    pub const fn per_minute(times: u32) -> Self {
        Self::new(times, 60)
    }
}

/// Limit on `GET /users/me`
pub const PROFILE_RATE_LIMIT: RateLimit = RateLimit::per_minute(5);

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub ok: bool,

    /// Requests remaining in the window
    pub remaining: u32,

    /// Seconds until the window closes
    pub reset_after: u64,
}

/// Turns a window counter and its TTL into a decision
///
/// `count` includes the current request. A TTL below zero (key without
/// expiry, or already gone) is treated as a full window.
pub fn evaluate(count: u64, ttl: i64, limit: RateLimit) -> RateLimitResult {
    let reset_after = if ttl < 0 { limit.seconds } else { ttl as u64 };
    let allowed = u64::from(limit.times);

    RateLimitResult {
        ok: count <= allowed,
        remaining: allowed.saturating_sub(count) as u32,
        reset_after,
    }
}

const WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {current, ttl}
"#;

/// Redis-backed fixed-window limiter
#[derive(Clone, Debug)]
pub struct RateLimiter {
    redis: RedisClient,
}

impl RateLimiter {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Counts one request against `key` and reports whether it is allowed
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis script fails or does not answer within
    /// the client's command timeout.
    pub async fn check(&self, key: &str, limit: RateLimit) -> Result<RateLimitResult, RedisClientError> {
        let mut conn = self.redis.get_connection();

        let script = redis::Script::new(WINDOW_SCRIPT);
        let mut invocation = script.key(key);
        invocation.arg(limit.seconds);

        let (count, ttl): (u64, i64) = self.redis.timed(invocation.invoke_async(&mut conn)).await?;

        Ok(evaluate(count, ttl, limit))
    }
}

/// `None` means the limiter is unavailable and the request goes through
fn counted_or_allow(
    checked: Result<RateLimitResult, RedisClientError>,
    scope: &str,
) -> Option<RateLimitResult> {
    match checked {
        Ok(result) => Some(result),
        Err(e) => {
            tracing::warn!(error = %e, scope, "Rate limit check failed, allowing request");
            None
        }
    }
}

fn rate_limit_key(scope: &str, user_id: i64) -> String {
    format!("ratelimit:{}:user:{}", scope, user_id)
}

async fn enforce(
    state: &AppState,
    auth: &AuthContext,
    scope: &str,
    limit: RateLimit,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };

    let checked = limiter.check(&rate_limit_key(scope, auth.user_id()), limit).await;
    let Some(result) = counted_or_allow(checked, scope) else {
        return Ok(next.run(request).await);
    };

    if !result.ok {
        tracing::info!(user_id = auth.user_id(), scope, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: result.reset_after,
            message: format!(
                "Rate limit exceeded. Try again in {} seconds",
                result.reset_after
            ),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.times));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));

    Ok(response)
}

/// Applies [`PROFILE_RATE_LIMIT`] to the current user
///
/// Must run after authentication so that [`AuthContext`] is present.
pub async fn profile_rate_limit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(&state, &auth, "users_me", PROFILE_RATE_LIMIT, request, next).await
}
