/// Todo model and database operations
///
/// Todos belong to their author (`author_id`); mutation rights are decided by
/// `auth::guard` against the author id, not here. Mutating lookups go through
/// [`Todo::find_for_update`] so the ownership check and the write happen on
/// the same locked row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Page, SortOrder};

/// Todo row as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub text: String,
    pub done: bool,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a todo
#[derive(Debug, Clone)]
pub struct CreateTodo {
    pub text: String,
    pub author_id: Uuid,
}

/// Input for updating a todo; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateTodo {
    pub text: Option<String>,
    pub done: Option<bool>,
}

/// Sortable columns for todo listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoSort {
    Id,
    Text,
    Done,
    AuthorId,
    #[default]
    CreatedAt,
}

impl TodoSort {
    /// Wire tokens accepted by [`TodoSort::parse`], for error messages.
    pub const ALLOWED: &'static [&'static str] = &["id", "text", "done", "authorId", "createdAt"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(TodoSort::Id),
            "text" => Some(TodoSort::Text),
            "done" => Some(TodoSort::Done),
            "authorId" => Some(TodoSort::AuthorId),
            "createdAt" => Some(TodoSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            TodoSort::Id => "id",
            TodoSort::Text => "text",
            TodoSort::Done => "done",
            TodoSort::AuthorId => "author_id",
            TodoSort::CreatedAt => "created_at",
        }
    }
}

/// Parameters for [`Todo::list`]
#[derive(Debug, Clone, Default)]
pub struct ListTodosParams {
    /// Free-text filter, matched against the todo text.
    pub q: Option<String>,

    pub sort: TodoSort,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

const TODO_COLUMNS: &str = "id, text, done, author_id, created_at";

impl Todo {
    pub async fn create(pool: &PgPool, data: CreateTodo) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO todos (text, author_id)
            VALUES ($1, $2)
            RETURNING {TODO_COLUMNS}
            "#,
        ))
        .bind(data.text)
        .bind(data.author_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetches and row-locks a todo for a subsequent update or delete.
    ///
    /// The lock holds until the transaction commits, so the ownership check
    /// made on the returned row still holds when the write executes.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Applies a partial update inside an open transaction.
    pub async fn update_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        data: UpdateTodo,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos SET
                text = COALESCE($2, text),
                done = COALESCE($3, done)
            WHERE id = $1
            RETURNING {TODO_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(data.text)
        .bind(data.done)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists todos with filtering, sorting and offset pagination.
    ///
    /// `total` counts every row matching the filter, not just the page.
    /// Sorting by a non-unique column (`done`, `text`) has no secondary key;
    /// the relative order of equal keys is database-chosen.
    pub async fn list(pool: &PgPool, params: &ListTodosParams) -> Result<Page<Self>, sqlx::Error> {
        let pattern = params.q.as_ref().map(|q| format!("%{q}%"));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM todos WHERE ($1::text IS NULL OR text ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS} FROM todos
            WHERE ($1::text IS NULL OR text ILIKE $1)
            ORDER BY {} {}
            LIMIT $2 OFFSET $3
            "#,
            params.sort.column(),
            params.order.sql(),
        ))
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(pool)
        .await?;

        Ok(Page { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_sort_parse_is_a_closed_set() {
        for token in TodoSort::ALLOWED {
            assert!(TodoSort::parse(token).is_some(), "token {token} should parse");
        }

        assert_eq!(TodoSort::parse("author_id"), None);
        assert_eq!(TodoSort::parse("CREATEDAT"), None);
        assert_eq!(TodoSort::parse("text; --"), None);
    }

    #[test]
    fn test_todo_sort_default_is_created_at() {
        assert_eq!(TodoSort::default(), TodoSort::CreatedAt);
    }

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = Todo {
            id: Uuid::new_v4(),
            text: "write docs".to_string(),
            done: false,
            author_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&todo).unwrap();
        assert!(json.get("authorId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("author_id").is_none());
    }
}
