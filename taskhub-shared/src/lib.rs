//! # taskhub shared library
//!
//! Types and business logic shared by the taskhub API server (and any future
//! companion binaries):
//!
//! - `models`: database models and their sqlx queries
//! - `auth`: password hashing, session store, ownership guard
//! - `events`: in-process domain-event bus
//! - `db`: connection pool and migration runner

pub mod auth;
pub mod db;
pub mod events;
pub mod models;

/// Current version of the taskhub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
