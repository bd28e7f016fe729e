/// Middleware for the API server
///
/// - `rate_limit`: sliding-window limiter keyed by (identity, ip)
/// - `security`: OWASP response headers
///
/// The session-auth layer itself lives next to the router in `app.rs`; the
/// extension types it inserts are defined here so handlers and middleware
/// share them.

pub mod rate_limit;
pub mod security;

use axum::http::HeaderMap;
use taskhub_shared::models::user::User;

/// Authenticated caller, inserted by the session-auth layer
///
/// Loaded fresh from the database on every request, so `role` is never older
/// than the request it gates.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Stored id (token digest) of the session backing this request
#[derive(Debug, Clone)]
pub struct CurrentSessionId(pub String);

/// Best-effort client IP for rate-limit keying
///
/// First address of `X-Forwarded-For` when present (the deployment fronts
/// this service with a proxy), else a fixed placeholder. Spoofable without
/// the proxy, which is acceptable for abuse throttling.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
