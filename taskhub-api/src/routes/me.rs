/// Current-user endpoints
///
/// - `GET /me` — own profile
/// - `PUT /me` — update own profile (role is not self-assignable)
/// - `DELETE /me` — delete own account and every session
/// - `GET /me/sessions` — list own live sessions
/// - `DELETE /me/sessions?ids=...` — terminate own sessions by id

use crate::{
    app::AppState,
    cookies,
    error::{ApiError, ApiResult},
    middleware::{CurrentSessionId, CurrentUser},
    pagination::parse_ids,
    response::{self, BulkResponse, DataResponse, Success},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskhub_shared::{
    events::DomainEvent,
    models::{
        session::Session,
        user::{Language, PublicUser, UpdateUser, User},
    },
};
use validator::Validate;

/// Self-update request; role is deliberately absent
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,

    /// Language code; validated against the supported set.
    pub language: Option<String>,
}

/// One live session of the caller
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Opaque handle, usable with `DELETE /me/sessions?ids=...`.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Whether this is the session backing the current request.
    pub current: bool,
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

/// Get the current user
pub async fn get_me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<DataResponse<PublicUser>>> {
    Ok(response::ok_with(PublicUser::from(user)))
}

/// Update the current user
///
/// # Errors
///
/// - `400 validation_error`
/// - `409 email_exists`: new email already registered to someone else
pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<DataResponse<PublicUser>>> {
    req.validate()?;

    let language = match req.language.as_deref() {
        None => None,
        Some(value) => Some(Language::parse(value).ok_or_else(|| {
            ApiError::validation("language", "unsupported language code")
        })?),
    };

    let email = match req.email {
        None => None,
        Some(raw) => {
            let email = raw.trim().to_lowercase();
            if User::email_taken(&state.db, &email, Some(user.id)).await? {
                return Err(ApiError::EmailExists);
            }
            Some(email)
        }
    };

    // Row lock so a concurrent admin delete is observed, not overwritten.
    let mut tx = state.db.begin().await?;

    if User::find_for_update(&mut tx, user.id).await?.is_none() {
        return Err(ApiError::not_found("user"));
    }

    let updated = User::update_tx(
        &mut tx,
        user.id,
        UpdateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email,
            language,
            role: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("user"))?;

    tx.commit().await?;

    state.events.emit(DomainEvent::UserUpdated { id: user.id });

    Ok(response::ok_with(PublicUser::from(updated)))
}

/// Delete the current user
///
/// Sessions cascade away with the row; the cookie is cleared.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Success>)> {
    if !User::delete(&state.db, user.id).await? {
        return Err(ApiError::not_found("user"));
    }

    state.events.emit(DomainEvent::UserDeleted { id: user.id });

    let jar = jar.remove(cookies::clear_session_cookie(&state.config));

    Ok((jar, response::ok()))
}

/// List the caller's live sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(CurrentSessionId(current_id)): Extension<CurrentSessionId>,
) -> ApiResult<Json<DataResponse<Vec<SessionInfo>>>> {
    let sessions = Session::list_for_user(&state.db, user.id).await?;

    let items = sessions
        .into_iter()
        .map(|session| SessionInfo {
            current: session.id == current_id,
            id: session.id,
            created_at: session.created_at,
            expires_at: session.expires_at,
        })
        .collect();

    Ok(response::ok_with(items))
}

/// Terminate sessions by id
///
/// Ids that are unknown, already expired away, or belong to another user
/// come back as per-id `not_found` entries; the rest are terminated. If the
/// current session is among them, the cookie is cleared too.
pub async fn terminate_sessions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(CurrentSessionId(current_id)): Extension<CurrentSessionId>,
    Query(query): Query<IdsQuery>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<BulkResponse>)> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or(""))?;

    let mut errors = Vec::new();
    let mut terminated = 0u64;
    let mut current_terminated = false;

    for id in &ids {
        if Session::delete_for_user(&state.db, id, user.id).await? {
            terminated += 1;
            if *id == current_id {
                current_terminated = true;
            }
        } else {
            errors.push(
                ApiError::NotFound {
                    resource: Some(id.clone()),
                }
                .body(),
            );
        }
    }

    if terminated > 0 {
        state.events.emit(DomainEvent::SessionsTerminated {
            user_id: user.id,
            count: terminated,
        });
    }

    let jar = if current_terminated {
        jar.remove(cookies::clear_session_cookie(&state.config))
    } else {
        jar
    };

    Ok((jar, response::ok_bulk(errors)))
}
