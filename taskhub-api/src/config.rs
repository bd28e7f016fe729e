/// Configuration management for the API server
///
/// Configuration is read from environment variables exactly once, in `main`,
/// and travels with the application state from there. Nothing reads the
/// environment after startup.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: bind host (default: 0.0.0.0)
/// - `API_PORT`: bind port (default: 3000)
/// - `CORS_ORIGINS`: comma-separated allowed origins, or `*` (default:
///   `http://localhost:5173`)
/// - `APP_ENV`: `production` enables Secure/Strict cookies and HSTS
/// - `SESSION_COOKIE_NAME`: cookie name (default: `taskhub_session`)
/// - `SESSION_TTL_SECONDS`: session lifetime (default: 2419200, four weeks)
/// - `RATE_LIMIT_MAX_REQUESTS`: requests per window per key (default: 100)
/// - `RATE_LIMIT_WINDOW_SECONDS`: window length (default: 60)
/// - `RUST_LOG`: log filter (default: info)

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` means permissive (development only).
    pub cors_origins: Vec<String>,

    /// Production mode: Secure cookies, SameSite=Strict, HSTS.
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_seconds: i64,
}

impl SessionConfig {
    /// Session lifetime as a chrono duration.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds)
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or any variable fails to
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "taskhub_session".to_string());

        // Four weeks, matching the session table's default lifetime.
        let ttl_seconds = env::var("SESSION_TTL_SECONDS")
            .unwrap_or_else(|_| "2419200".to_string())
            .parse::<i64>()?;

        if ttl_seconds <= 0 {
            anyhow::bail!("SESSION_TTL_SECONDS must be positive");
        }

        let max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()?;

        let window_seconds = env::var("RATE_LIMIT_WINDOW_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()?;

        if window_seconds == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECONDS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url,
                max_connections,
            },
            session: SessionConfig {
                cookie_name,
                ttl_seconds,
            },
            rate_limit: RateLimitConfig {
                max_requests,
                window_seconds,
            },
        })
    }

    /// Returns the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origins: vec!["http://localhost:5173".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/taskhub_test".to_string(),
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
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_session_ttl() {
        let config = test_config();
        assert_eq!(config.session.ttl(), chrono::Duration::weeks(4));
    }
}
