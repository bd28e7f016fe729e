/// Authentication endpoints
///
/// - `POST /auth/sign-up` — create an account, start a session
/// - `POST /auth/sign-in` — verify credentials, start a session
/// - `POST /auth/sign-out` — end the current session
///
/// All three set or clear the httpOnly session cookie; the response body
/// never carries the token.

use crate::{
    app::AppState,
    cookies,
    error::{ApiError, ApiResult},
    response::{self, DataResponse, Success},
};
use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use taskhub_shared::{
    auth::{password, session},
    events::DomainEvent,
    models::user::{CreateUser, Language, PublicUser, User},
};
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: String,

    #[validate(email(message = "invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Sign up with email and password
///
/// # Errors
///
/// - `400 validation_error`: malformed fields or weak password
/// - `409 email_exists`: email already registered (case-insensitive)
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(CookieJar, Json<DataResponse<PublicUser>>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::validation("password", message))?;

    let email = req.email.trim().to_lowercase();

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::EmailExists);
    }

    let hashed_password = password::hash_password(&req.password)?;

    // A concurrent duplicate sign-up loses on the unique email index and
    // maps to email_exists through the sqlx conversion.
    let user = User::create(
        &state.db,
        CreateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email,
            hashed_password,
            language: Language::default(),
        },
    )
    .await?;

    let (_, token) = session::create_session(&state.db, user.id, state.config.session.ttl()).await?;

    state.events.emit(DomainEvent::UserSignedUp { id: user.id });

    let jar = jar.add(cookies::build_session_cookie(&state.config, token));

    Ok((jar, response::ok_with(PublicUser::from(user))))
}

/// Sign in with email and password
///
/// # Errors
///
/// - `404 not_found`: no account for this email
/// - `400 invalid_password`: wrong password; no session is issued
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> ApiResult<(CookieJar, Json<DataResponse<PublicUser>>)> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    if !password::verify_password(&req.password, &user.hashed_password)? {
        return Err(ApiError::InvalidPassword);
    }

    let (_, token) = session::create_session(&state.db, user.id, state.config.session.ttl()).await?;

    state.events.emit(DomainEvent::UserSignedIn { id: user.id });

    let jar = jar.add(cookies::build_session_cookie(&state.config, token));

    Ok((jar, response::ok_with(PublicUser::from(user))))
}

/// Sign out and clear the session cookie
///
/// Succeeds regardless of whether the cookie still maps to a live session.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Success>)> {
    if let Some(cookie) = jar.get(&state.config.session.cookie_name) {
        session::invalidate_session(&state.db, cookie.value()).await?;
    }

    let jar = jar.remove(cookies::clear_session_cookie(&state.config));

    Ok((jar, response::ok()))
}
