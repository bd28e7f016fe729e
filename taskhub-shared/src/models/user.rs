/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,               -- unique via LOWER(email) index
///     hashed_password TEXT NOT NULL,
///     language user_language NOT NULL DEFAULT 'en',
///     role user_role NOT NULL DEFAULT 'USER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The `name` column is the display name and is kept equal to
/// `"{first_name} {last_name}"` by [`User::create`] and [`User::update_tx`].
///
/// Passwords are stored as Argon2id hashes (see `auth::password`) and never
/// leave the crate boundary: the API serializes [`PublicUser`], which has no
/// password field at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Page, SortOrder};

/// System-level role of a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Parses the wire value (`USER` / `ADMIN`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(UserRole::User),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// UI language of a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_language", rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// User row as stored in the database
///
/// Deliberately not `Serialize`: anything that leaves the process goes
/// through [`PublicUser`] instead, so the password hash cannot leak by
/// accident.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,

    /// Display name, derived from first and last name.
    pub name: String,

    /// Stored lowercased; lookups go through `LOWER(email)`.
    pub email: String,

    /// Argon2id PHC string.
    pub hashed_password: String,

    pub language: Language,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Outward-facing projection of a [`User`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    pub language: Language,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            name: user.name,
            email: user.email,
            language: user.language,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,

    /// Must already be lowercased by the caller.
    pub email: String,

    /// Argon2id hash, not a plaintext password.
    pub hashed_password: String,

    pub language: Language,
}

/// Input for updating an existing user; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub language: Option<Language>,
    pub role: Option<UserRole>,
}

/// Sortable columns for user listings
///
/// The wire tokens are the camelCase field names of [`PublicUser`]; anything
/// outside this set is a validation error at the boundary, never passed to
/// SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    Id,
    Name,
    Email,
    Role,
    #[default]
    CreatedAt,
}

impl UserSort {
    /// Wire tokens accepted by [`UserSort::parse`], for error messages.
    pub const ALLOWED: &'static [&'static str] = &["id", "name", "email", "role", "createdAt"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(UserSort::Id),
            "name" => Some(UserSort::Name),
            "email" => Some(UserSort::Email),
            "role" => Some(UserSort::Role),
            "createdAt" => Some(UserSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            UserSort::Id => "id",
            UserSort::Name => "name",
            UserSort::Email => "email",
            UserSort::Role => "role",
            UserSort::CreatedAt => "created_at",
        }
    }
}

/// Parameters for [`User::list`]
#[derive(Debug, Clone, Default)]
pub struct ListUsersParams {
    /// Free-text filter, matched against the display name.
    pub q: Option<String>,

    pub role: Option<UserRole>,
    pub sort: UserSort,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, name, email, hashed_password, language, role, created_at";

impl User {
    /// Inserts a new user.
    ///
    /// The display name is derived from the given first and last name. A
    /// duplicate email surfaces as a unique-constraint violation on
    /// `idx_users_email_lower`.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let name = format!("{} {}", data.first_name, data.last_name);

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, name, email, hashed_password, language)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(name)
        .bind(data.email)
        .bind(data.hashed_password)
        .bind(data.language)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetches a user inside an open transaction.
    ///
    /// Mutating handlers use this to re-read the caller's role right before
    /// the write, so a concurrent role change or deletion is observed.
    pub async fn find_by_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Fetches and row-locks a user for a subsequent update or delete.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Case-insensitive email lookup.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Whether an email is already registered, optionally ignoring one user
    /// (the row being updated).
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1)
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(pool)
        .await
    }

    /// Applies a partial update inside an open transaction.
    ///
    /// The display name is recomputed from the effective first and last name
    /// in the same statement. Returns `None` if the user no longer exists.
    pub async fn update_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name  = COALESCE($3, last_name),
                name       = COALESCE($2, first_name) || ' ' || COALESCE($3, last_name),
                email      = COALESCE($4, email),
                language   = COALESCE($5, language),
                role       = COALESCE($6, role)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.language)
        .bind(data.role)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Deletes a user. Sessions and todos cascade at the database level.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users with filtering, sorting and offset pagination.
    ///
    /// `total` counts every row matching the filter, not just the page.
    /// Sorting by a non-unique column (`name`, `role`) has no secondary key;
    /// the relative order of equal keys is database-chosen.
    pub async fn list(pool: &PgPool, params: &ListUsersParams) -> Result<Page<Self>, sqlx::Error> {
        let pattern = params.q.as_ref().map(|q| format!("%{q}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
            "#,
        )
        .bind(&pattern)
        .bind(params.role)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
            ORDER BY {} {}
            LIMIT $3 OFFSET $4
            "#,
            params.sort.column(),
            params.order.sql(),
        ))
        .bind(&pattern)
        .bind(params.role)
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
    fn test_user_role_parse() {
        assert_eq!(UserRole::parse("USER"), Some(UserRole::User));
        assert_eq!(UserRole::parse("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(UserRole::parse(""), None);
    }

    #[test]
    fn test_user_sort_parse_is_a_closed_set() {
        for token in UserSort::ALLOWED {
            assert!(UserSort::parse(token).is_some(), "token {token} should parse");
        }

        assert_eq!(UserSort::parse("created_at"), None);
        assert_eq!(UserSort::parse("hashedPassword"), None);
        assert_eq!(UserSort::parse("name; DROP TABLE users"), None);
    }

    #[test]
    fn test_user_sort_default_is_created_at() {
        assert_eq!(UserSort::default(), UserSort::CreatedAt);
    }

    #[test]
    fn test_public_user_has_no_password() {
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            hashed_password: "$argon2id$...".to_string(),
            language: Language::En,
            role: UserRole::User,
            created_at: Utc::now(),
        };

        let public = PublicUser::from(user);
        let json = serde_json::to_value(&public).unwrap();

        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["role"], "USER");
        assert_eq!(json["language"], "en");
        assert!(json.get("hashedPassword").is_none());
        assert!(json.get("hashed_password").is_none());
    }
}
