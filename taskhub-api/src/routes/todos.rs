/// Todos endpoints
///
/// Any authenticated user can list and read todos and create their own;
/// mutation is gated by the ownership guard (owner or ADMIN). Mutating
/// handlers lock the row and re-read the caller inside one transaction, so
/// the permission they check is the one that holds when the write lands.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::CurrentUser,
    pagination::{parse_enum, parse_ids, parse_limit, parse_offset},
    response::{self, BulkResponse, DataResponse, PageData, Success},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use taskhub_shared::{
    auth::guard,
    events::DomainEvent,
    models::{
        todo::{CreateTodo, ListTodosParams, Todo, TodoSort, UpdateTodo},
        user::User,
        SortOrder,
    },
};
use uuid::Uuid;
use validator::Validate;

/// List query; raw strings, validated in the handler
#[derive(Debug, Deserialize)]
pub struct ListTodosQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTodoRequest {
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub text: Option<String>,

    pub done: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

/// List todos with filtering, sorting and pagination
pub async fn list_todos(
    State(state): State<AppState>,
    Query(query): Query<ListTodosQuery>,
) -> ApiResult<Json<DataResponse<PageData<Todo>>>> {
    let params = ListTodosParams {
        q: query.q.filter(|q| !q.is_empty()),
        sort: parse_enum("sort", query.sort.as_deref(), TodoSort::parse, TodoSort::ALLOWED)?,
        order: parse_enum(
            "order",
            query.order.as_deref(),
            SortOrder::parse,
            &["asc", "desc"],
        )?,
        limit: parse_limit(query.limit.as_deref())?,
        offset: parse_offset(query.offset.as_deref())?,
    };

    let page = Todo::list(&state.db, &params).await?;

    Ok(response::ok_page(page.items, page.total))
}

/// Create a todo owned by the caller
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(req): Json<CreateTodoRequest>,
) -> ApiResult<Json<DataResponse<Todo>>> {
    req.validate()?;

    let todo = Todo::create(
        &state.db,
        CreateTodo {
            text: req.text,
            author_id: caller.id,
        },
    )
    .await?;

    state.events.emit(DomainEvent::TodoCreated {
        id: todo.id,
        author_id: todo.author_id,
    });

    Ok(response::ok_with(todo))
}

/// Get a todo by id
pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataResponse<Todo>>> {
    let todo = Todo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("todo"))?;

    Ok(response::ok_with(todo))
}

/// Update a todo (owner or ADMIN)
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTodoRequest>,
) -> ApiResult<Json<DataResponse<Todo>>> {
    req.validate()?;

    let mut tx = state.db.begin().await?;

    let todo = Todo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("todo"))?;

    let caller_now = User::find_by_id_tx(&mut tx, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;

    guard::require_owner_or_admin(caller_now.role, caller_now.id, todo.author_id)
        .map_err(|_| ApiError::forbidden("todo"))?;

    let updated = Todo::update_tx(
        &mut tx,
        id,
        UpdateTodo {
            text: req.text,
            done: req.done,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("todo"))?;

    tx.commit().await?;

    state.events.emit(DomainEvent::TodoUpdated { id });

    Ok(response::ok_with(updated))
}

/// Delete a todo (owner or ADMIN)
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Success>> {
    let mut tx = state.db.begin().await?;

    let todo = Todo::find_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("todo"))?;

    let caller_now = User::find_by_id_tx(&mut tx, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;

    guard::require_owner_or_admin(caller_now.role, caller_now.id, todo.author_id)
        .map_err(|_| ApiError::forbidden("todo"))?;

    Todo::delete_tx(&mut tx, id).await?;
    tx.commit().await?;

    state.events.emit(DomainEvent::TodoDeleted { id });

    Ok(response::ok())
}

/// Bulk-delete todos by id
///
/// Ids are processed independently; denied ids become per-id `forbidden`
/// entries, unknown or malformed ids per-id `not_found` entries.
pub async fn delete_todos(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Query(query): Query<IdsQuery>,
) -> ApiResult<Json<BulkResponse>> {
    let ids = parse_ids(query.ids.as_deref().unwrap_or(""))?;

    let mut errors = Vec::new();

    for raw_id in &ids {
        let Ok(id) = raw_id.parse::<Uuid>() else {
            errors.push(
                ApiError::NotFound {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
            continue;
        };

        let mut tx = state.db.begin().await?;

        let Some(todo) = Todo::find_for_update(&mut tx, id).await? else {
            errors.push(
                ApiError::NotFound {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
            continue;
        };

        let caller_now = User::find_by_id_tx(&mut tx, caller.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))?;

        if guard::is_allowed(caller_now.role, caller_now.id, todo.author_id) {
            Todo::delete_tx(&mut tx, id).await?;
            tx.commit().await?;
            state.events.emit(DomainEvent::TodoDeleted { id });
        } else {
            errors.push(
                ApiError::Forbidden {
                    resource: Some(raw_id.clone()),
                }
                .body(),
            );
        }
    }

    Ok(response::ok_bulk(errors))
}
