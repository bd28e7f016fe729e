/// Rate limiting middleware
///
/// Sliding-window counter keyed by `(identity, ip)`, where identity is the
/// authenticated user id or `anon` for public endpoints. State is an
/// in-process map — each instance throttles independently, which matches the
/// single-node deployment this starter targets.
///
/// # Algorithm
///
/// Two-bucket sliding window: requests are counted per fixed window, and the
/// effective count is `current + previous * (1 - elapsed_fraction)`. This
/// smooths the burst-at-boundary problem of plain fixed windows without
/// keeping a timestamp log per key.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: best-effort remaining quota
/// - `Retry-After`: seconds to wait (429 responses only, set by `ApiError`)

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{client_ip, CurrentUser};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    /// `now / window_seconds` of the current bucket.
    window_index: u64,
    current: u32,
    previous: u32,
}

/// In-process sliding-window rate limiter
///
/// Cloning shares the underlying counter map.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window_seconds: u64,
    buckets: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Checks and counts one request for `key` at `now_secs` (Unix seconds).
    ///
    /// Taking the clock as a parameter keeps the window math testable.
    pub fn check(&self, key: &str, now_secs: u64) -> RateDecision {
        let window_index = now_secs / self.window_seconds;
        let elapsed_fraction =
            (now_secs % self.window_seconds) as f64 / self.window_seconds as f64;

        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        // Stale keys accumulate between requests; drop dead windows once the
        // map gets large.
        if buckets.len() > 10_000 {
            buckets.retain(|_, state| state.window_index + 1 >= window_index);
        }

        let state = buckets.entry(key.to_string()).or_insert(WindowState {
            window_index,
            current: 0,
            previous: 0,
        });

        if state.window_index != window_index {
            state.previous = if state.window_index + 1 == window_index {
                state.current
            } else {
                0
            };
            state.current = 0;
            state.window_index = window_index;
        }

        let weighted =
            state.current as f64 + state.previous as f64 * (1.0 - elapsed_fraction);

        if weighted + 1.0 > self.max_requests as f64 {
            RateDecision {
                allowed: false,
                remaining: 0,
                retry_after: self.window_seconds - now_secs % self.window_seconds,
            }
        } else {
            state.current += 1;
            RateDecision {
                allowed: true,
                remaining: (self.max_requests as f64 - weighted - 1.0).max(0.0) as u32,
                retry_after: 0,
            }
        }
    }
}

/// Rate limiting middleware layer
///
/// Runs after the session-auth layer on protected routes (so the key carries
/// the user id) and standalone on public auth routes (`anon` identity).
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.0.id.to_string())
        .unwrap_or_else(|| "anon".to_string());

    let key = format!("{identity}@{}", client_ip(request.headers()));

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let decision = state.limiter.check(&key, now_secs);

    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after: decision.retry_after,
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&state.limiter.max_requests().to_string()) {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("X-RateLimit-Remaining", value);
    }

    Ok(response)
}
