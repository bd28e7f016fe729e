/// Application state and router builder
///
/// # Routes
///
/// ```text
/// /
/// ├── GET  /health                 # liveness + DB probe (public)
/// ├── POST /auth/sign-up           # public, rate limited
/// ├── POST /auth/sign-in
/// ├── POST /auth/sign-out
/// ├── /me                          # session required
/// │   ├── GET / PUT / DELETE /me
/// │   ├── GET    /me/sessions
/// │   └── DELETE /me/sessions?ids=...
/// ├── /users                       # session required, mostly admin
/// │   ├── GET    /users            (ADMIN)
/// │   ├── DELETE /users?ids=...    (ADMIN or self, per id)
/// │   ├── GET    /users/:id
/// │   └── PUT    /users/:id        (ADMIN)
/// └── /todos                       # session required
///     ├── GET / POST /todos
///     ├── DELETE /todos?ids=...
///     └── GET / PUT / DELETE /todos/:id
/// ```
///
/// # Middleware stack
///
/// Outer layers: request tracing, CORS, security headers. Protected routes
/// additionally run session auth then rate limiting (in that order, so the
/// limiter key carries the user id); public auth routes run the limiter with
/// an anonymous key.

use crate::{
    config::Config,
    cookies,
    error::ApiError,
    middleware::{security::SecurityHeadersLayer, CurrentSessionId, CurrentUser},
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::{auth::session, events::EventBus};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::middleware::rate_limit::{rate_limit_layer, RateLimiter};

/// Shared application state
///
/// Cloned per request; everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration, built once in `main`
    pub config: Arc<Config>,

    /// Domain-event bus
    pub events: EventBus,

    /// Rate limiter shared across requests
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, events: EventBus) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window_seconds,
        );

        Self {
            db,
            config: Arc::new(config),
            events,
            limiter,
        }
    }
}

/// Builds the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth endpoints: no session, anonymous rate-limit key.
    let auth_routes = Router::new()
        .route("/auth/sign-up", post(routes::auth::sign_up))
        .route("/auth/sign-in", post(routes::auth::sign_in))
        .route("/auth/sign-out", post(routes::auth::sign_out))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ));

    // Everything else requires a valid session. Layers run bottom-up:
    // session auth first, then the rate limiter sees the user id.
    let protected_routes = Router::new()
        .route(
            "/me",
            get(routes::me::get_me)
                .put(routes::me::update_me)
                .delete(routes::me::delete_me),
        )
        .route(
            "/me/sessions",
            get(routes::me::list_sessions).delete(routes::me::terminate_sessions),
        )
        .route(
            "/users",
            get(routes::users::list_users).delete(routes::users::delete_users),
        )
        .route(
            "/users/:id",
            get(routes::users::get_user).put(routes::users::update_user),
        )
        .route(
            "/todos",
            get(routes::todos::list_todos)
                .post(routes::todos::create_todo)
                .delete(routes::todos::delete_todos),
        )
        .route(
            "/todos/:id",
            get(routes::todos::get_todo)
                .put(routes::todos::update_todo)
                .delete(routes::todos::delete_todo),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS (no credentials).
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Session authentication middleware layer
///
/// Validates the session cookie against the database and injects
/// [`CurrentUser`] and [`CurrentSessionId`] into request extensions. The
/// user row is loaded fresh here on every request; mutating handlers
/// re-check it again inside their transaction.
async fn session_auth_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("missing session cookie".to_string()))?;

    let validated = session::validate_session(&state.db, &token, state.config.session.ttl())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired session".to_string()))?;

    request
        .extensions_mut()
        .insert(CurrentSessionId(validated.session.id.clone()));
    request.extensions_mut().insert(CurrentUser(validated.user));

    let renewed = validated.renewed;
    let mut response = next.run(request).await;

    // Expiry slid forward: re-issue the cookie so the browser keeps it.
    if renewed {
        let cookie = cookies::build_session_cookie(&state.config, token);
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}
