/// Opaque-token session management
///
/// Sessions are bearer tokens carried in an httpOnly cookie and backed by the
/// `sessions` table. The token is 32 random bytes, hex-encoded; the table
/// stores only its SHA-256 digest, so a leaked database dump contains no
/// usable bearer material.
///
/// Validation slides the expiry: once a session is past the halfway point of
/// its TTL, a successful validation extends it by a full TTL and reports
/// `renewed` so the caller can re-issue the cookie.

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::session::Session;
use crate::models::user::User;

/// Raw token length in bytes before hex encoding.
const TOKEN_BYTES: usize = 32;

/// A successfully validated session with its owning user.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session: Session,
    pub user: User,

    /// True when the expiry was extended; the caller should re-issue the
    /// cookie so its Max-Age matches.
    pub renewed: bool,
}

/// Generates a fresh bearer token (64 hex chars).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest of a bearer token; this is the session id stored in the database.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues a new session for a user.
///
/// Returns the stored row and the raw token destined for the cookie. The raw
/// token is returned exactly once; it cannot be recovered later.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl: Duration,
) -> Result<(Session, String), sqlx::Error> {
    let token = generate_token();
    let id = hash_token(&token);

    let session = Session::insert(pool, &id, user_id, Utc::now() + ttl).await?;

    tracing::debug!(user_id = %user_id, session_id = %session.id, "session issued");

    Ok((session, token))
}

/// Validates a bearer token against the sessions table.
///
/// Returns `None` for unknown or expired tokens (expired rows are dropped on
/// the way out). Loads the owning user fresh from the database, so revoked
/// accounts fail here and a caller's role is never older than this request.
pub async fn validate_session(
    pool: &PgPool,
    token: &str,
    ttl: Duration,
) -> Result<Option<ValidatedSession>, sqlx::Error> {
    let id = hash_token(token);

    let Some(mut session) = Session::find_by_id(pool, &id).await? else {
        return Ok(None);
    };

    let now = Utc::now();
    if session.expires_at <= now {
        Session::delete(pool, &id).await?;
        return Ok(None);
    }

    let Some(user) = User::find_by_id(pool, session.user_id).await? else {
        // User row gone but cascade not yet observed; treat as signed out.
        Session::delete(pool, &id).await?;
        return Ok(None);
    };

    let mut renewed = false;
    if session.expires_at - now < ttl / 2 {
        let expires_at = now + ttl;
        Session::extend(pool, &id, expires_at).await?;
        session.expires_at = expires_at;
        renewed = true;
    }

    Ok(Some(ValidatedSession {
        session,
        user,
        renewed,
    }))
}

/// Invalidates the session behind a bearer token. Idempotent.
pub async fn invalidate_session(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    Session::delete(pool, &hash_token(token)).await
}
