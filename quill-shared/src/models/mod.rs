/// Database models for Quill
///
/// Each model owns its SQL and exposes async CRUD functions taking a `&PgPool`.
///
/// # Models
///
/// - `user`: Accounts, password hashes, active/staff flags
/// - `token`: Opaque bearer tokens issued at login
/// - `category`: Article categories
/// - `article`: Blog articles and the joined read view used by the API
/// - `comment`: Comments attached to articles
/// - `admin_session`: Cookie sessions for the staff admin UI
///
/// # Example
///
/// ```no_run
/// use quill_shared::models::user::{CreateUser, User};
/// use quill_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod admin_session;
pub mod article;
pub mod category;
pub mod comment;
pub mod token;
pub mod user;
