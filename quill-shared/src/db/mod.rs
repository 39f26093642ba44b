/// Database layer for Quill
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Runner for the SQL migrations bundled in `migrations/`
///
/// # Example
///
/// ```no_run
/// use quill_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::new(std::env::var("DATABASE_URL")?);
///
///     let pool = create_pool(config).await?;
///     quill_shared::db::migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

/// Returns true when the error is a unique-constraint violation
///
/// When `constraint` is given, the violated constraint name must match it.
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let unique = db_err.is_unique_violation();
            match constraint {
                Some(name) => unique && db_err.constraint() == Some(name),
                None => unique,
            }
        }
        _ => false,
    }
}
