/// Session cookie helpers
///
/// The session credential is an httpOnly cookie holding the raw bearer
/// token. No Max-Age is set: the browser keeps it for the session while the
/// server enforces the real expiry on the sessions table.

use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Config;

/// Builds the session cookie carrying a freshly issued token.
///
/// `SameSite=Strict` and `Secure` in production, `Lax` in development so the
/// Vite dev server on another port can authenticate.
pub fn build_session_cookie(config: &Config, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.session.cookie_name.clone(), token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_secure(config.api.production);
    cookie.set_same_site(if config.api.production {
        SameSite::Strict
    } else {
        SameSite::Lax
    });
    cookie
}

/// Builds a cookie matching the session cookie's name and path, for removal
/// via `CookieJar::remove`.
pub fn clear_session_cookie(config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.session.cookie_name.clone(), "");
    cookie.set_path("/");
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, RateLimitConfig, SessionConfig};

    fn config(production: bool) -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origins: vec![],
                production,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
            },
            session: SessionConfig {
                cookie_name: "taskhub_session".to_string(),
                ttl_seconds: 2_419_200,
            },
            rate_limit: RateLimitConfig {
                max_requests: 100,
                window_seconds: 60,
            },
        }
    }

    #[test]
    fn test_development_cookie() {
        let cookie = build_session_cookie(&config(false), "tok".to_string());

        assert_eq!(cookie.name(), "taskhub_session");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_production_cookie_is_strict_and_secure() {
        let cookie = build_session_cookie(&config(true), "tok".to_string());

        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_clear_cookie_matches_name_and_path() {
        let cookie = clear_session_cookie(&config(false));
        assert_eq!(cookie.name(), "taskhub_session");
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.value().is_empty());
    }
}
