/// User management endpoints
///
/// - `GET /users` — list users (ADMIN)
/// - `GET /users/:id` — fetch one user (any authenticated caller)
/// - `PUT /users/:id` — update a user, including role (ADMIN)
/// - `DELETE /users?ids=...` — bulk delete; each id allowed for ADMIN or the
///   caller themselves, everything else reported per id

use crate::{
    app::AppState,
    cookies,
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    pagination::{parse_enum, parse_ids, parse_limit, parse_offset},
    response::{self, BulkResponse, DataResponse, PageData},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use taskhub_shared::{
    auth::guard,
    events::DomainEvent,
    models::{
        user::{Language, ListUsersParams, PublicUser, UpdateUser, User, UserRole, UserSort},
        SortOrder,
    },
};
use uuid::Uuid;
use validator::Validate;

/// List query; raw strings, validated in the handler
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub role: Option<String>,
}

/// Admin update request; unlike `PUT /me` this may change the role
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,

    pub language: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

/// List users (ADMIN only)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<DataResponse<PageData<PublicUser>>>> {
    guard::require_admin(caller.role).map_err(|_| ApiError::forbidden("users"))?;

    let params = ListUsersParams {
        q: query.q.filter(|q| !q.is_empty()),
        role: match query.role.as_deref() {
            None => None,
            Some(value) => Some(
                UserRole::parse(value)
                    .ok_or_else(|| ApiError::validation("role", "must be one of: USER, ADMIN"))?,
            ),
        },
        sort: parse_enum("sort", query.sort.as_deref(), UserSort::parse, UserSort::ALLOWED)?,
        order: parse_enum(
            "order",
            query.order.as_deref(),
            SortOrder::parse,
            &["asc", "desc"],
        )?,
        limit: parse_limit(query.limit.as_deref())?,
        offset: parse_offset(query.offset.as_deref())?,
    };

    let page = User::list(&state.db, &params).await?;

    Ok(response::ok_page(
        page.items.into_iter().map(PublicUser::from).collect(),
        page.total,
    ))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataResponse<PublicUser>>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(response::ok_with(PublicUser::from(user)))
}

/// Update a user by id (ADMIN only)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<DataResponse<PublicUser>>> {
    guard::require_admin(caller.role).map_err(|_| ApiError::forbidden("user"))?;

    req.validate()?;

    let language = match req.language.as_deref() {
        None => None,
        Some(value) => Some(Language::parse(value).ok_or_else(|| {
            ApiError::validation("language", "unsupported language code")
        })?),
    };

    let role = match req.role.as_deref() {
        None => None,
        Some(value) => Some(
            UserRole::parse(value)
                .ok_or_else(|| ApiError::validation("role", "must be one of: USER, ADMIN"))?,
        ),
    };

    let email = match req.email {
        None => None,
        Some(raw) => {
            let email = raw.trim().to_lowercase();
            if User::email_taken(&state.db, &email, Some(id)).await? {
                return Err(ApiError::EmailExists);
            }
            Some(email)
        }
    };

    let mut tx = state.db.begin().await?;

    if User::find_for_update(&mut tx, id).await?.is_none() {
        return Err(ApiError::not_found("user"));
    }

    // The admin check above ran against request-time state; repeat it on the
    // row as it is now, inside the same transaction as the write.
    let caller_now = User::find_by_id_tx(&mut tx, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;
    guard::require_admin(caller_now.role).map_err(|_| ApiError::forbidden("user"))?;

    let updated = User::update_tx(
        &mut tx,
        id,
        UpdateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email,
            language,
            role,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("user"))?;

    tx.commit().await?;

    state.events.emit(DomainEvent::UserUpdated { id });

    Ok(response::ok_with(PublicUser::from(updated)))
}

/// Bulk-delete users by id
///
/// Each id is processed independently: ADMIN may delete anyone, a regular
/// user only themselves. Denied ids yield per-id `forbidden` entries, unknown
/// or malformed ids per-id `not_found` entries. Deleting oneself clears the
/// session cookie.
pub async fn delete_users(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Query(query): Query<IdsQuery>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<BulkResponse>)> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or(""))?;

    let mut errors = Vec::new();
    let mut deleted_self = false;

    for raw_id in &ids {
        let Ok(target_id) = raw_id.parse::<Uuid>() else {
            errors.push(
                ApiError::NotFound {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
            continue;
        };

        let mut tx = state.db.begin().await?;

        // Re-read the caller per item: a concurrent demotion or deletion
        // must stop the remaining items.
        let caller_now = User::find_by_id_tx(&mut tx, caller.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;

        if !guard::is_allowed(caller_now.role, caller_now.id, target_id) {
            errors.push(
                ApiError::Forbidden {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
            continue;
        }

        if User::delete_tx(&mut tx, target_id).await? {
            tx.commit().await?;
            state.events.emit(DomainEvent::UserDeleted { id: target_id });
            if target_id == caller.id {
                deleted_self = true;
            }
        } else {
            errors.push(
                ApiError::NotFound {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
        }
    }

    let jar = if deleted_self {
        jar.remove(cookies::clear_session_cookie(&state.config))
    } else {
        jar
    };

    Ok((jar, response::ok_bulk(errors)))
}
