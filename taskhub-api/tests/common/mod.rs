/// Common test utilities for integration tests
///
/// Integration tests exercise the full router against a real PostgreSQL
/// database. They need `DATABASE_URL` pointing at a scratch database; when it
/// is unset, [`TestContext::new`] returns `None` and each test skips itself.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use sqlx::PgPool;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::{ApiConfig, Config, DatabaseConfig, RateLimitConfig, SessionConfig};
use taskhub_shared::events::EventBus;
use tower::ServiceExt as _;
use uuid::Uuid;

/// Test context: a built router plus direct database access
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

impl TestContext {
    /// Connects, migrates and builds the app; `None` when `DATABASE_URL` is
    /// unset so tests skip on machines without a database.
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        };

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec![],
                production: false,
            },
            database: DatabaseConfig {
                url: url.clone(),
                max_connections: 5,
            },
            session: SessionConfig {
                cookie_name: "taskhub_session".to_string(),
                ttl_seconds: 2_419_200,
            },
            // High enough that tests never trip the limiter by accident.
            rate_limit: RateLimitConfig {
                max_requests: 100_000,
                window_seconds: 60,
            },
        };

        let db = PgPool::connect(&url).await.expect("connect to test database");
        sqlx::migrate!("../migrations")
            .run(&db)
            .await
            .expect("run migrations");

        let state = AppState::new(db.clone(), config, EventBus::default());

        Some(TestContext {
            db,
            app: build_router(state),
        })
    }

    /// Sends one request; `cookie` is a full `name=value` pair.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, HeaderMap, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, headers, json)
    }

    /// Signs up a fresh user; returns (session cookie pair, user json).
    pub async fn sign_up(&self, email: &str, password: &str) -> (String, serde_json::Value) {
        let (status, headers, json) = self
            .request(
                Method::POST,
                "/auth/sign-up",
                None,
                Some(serde_json::json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "email": email,
                    "password": password,
                })),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "sign-up failed: {json}");

        (
            session_cookie(&headers).expect("sign-up should set a session cookie"),
            json["data"].clone(),
        )
    }

    /// Signs in an existing user; returns the session cookie pair.
    pub async fn sign_in(&self, email: &str, password: &str) -> String {
        let (status, headers, json) = self
            .request(
                Method::POST,
                "/auth/sign-in",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "sign-in failed: {json}");

        session_cookie(&headers).expect("sign-in should set a session cookie")
    }

    /// Promotes a user to ADMIN directly in the database.
    pub async fn promote_to_admin(&self, user_id: &str) {
        sqlx::query("UPDATE users SET role = 'ADMIN' WHERE id = $1::uuid")
            .bind(user_id)
            .execute(&self.db)
            .await
            .expect("promote user");
    }

    /// Counts sessions currently stored for a user.
    pub async fn session_count(&self, user_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = $1::uuid")
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .expect("count sessions")
    }
}

/// Extracts the `name=value` pair of the session cookie from `Set-Cookie`.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("taskhub_session=") && !v.starts_with("taskhub_session=;"))
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string())
}

/// Fresh unique email for a test.
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}
