/// Schema migrations
///
/// The SQL files live in the workspace-level `migrations/` directory and are
/// embedded at compile time.

use sqlx::{
    migrate::{MigrateDatabase, MigrateError, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, error, info};

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies pending migrations
///
/// # Errors
///
/// Fails if a migration errors or an applied one was edited afterwards.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    let known = MIGRATOR.iter().count();
    info!(migrations = known, "Applying database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema up to date");
    Ok(())
}

/// Creates the database named in `database_url` if it is missing
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database exists");
        return Ok(());
    }

    info!("Creating database");
    Postgres::create_database(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions.len(), 4);

        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_migrations_create_blog_tables() {
        let sql: String = MIGRATOR.iter().map(|m| m.sql.as_ref()).collect();
        for table in ["users", "user_tokens", "categories", "articles", "comments", "admin_sessions"] {
            assert!(
                sql.contains(&format!("CREATE TABLE {table}")),
                "missing table {table}"
            );
        }
    }
}
