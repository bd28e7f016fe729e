/// Database migration runner
///
/// Migrations live in `migrations/` at the workspace root and are embedded
/// at compile time via `sqlx::migrate!`. The server runs them on startup;
/// integration tests run them against their own database.

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies all pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("running database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("database migrations up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "migration failed");
            Err(e)
        }
    }
}

/// Creates the database if it doesn't exist. Development and test helper;
/// production databases are provisioned out of band.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("database already exists");
    }

    Ok(())
}
