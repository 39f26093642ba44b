/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`token`]: Bearer token issuance, validation and revocation
/// - [`extract`]: Token sources (header, JSON body) and the request auth context
/// - [`ownership`]: Author-only checks for articles and comments
///
/// # Example
///
/// ```no_run
/// use quill_shared::auth::token::{issue, TokenPolicy};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let issued = issue(&pool, "alice", "s3cret", &TokenPolicy::default()).await?;
/// println!("expires at {}", issued.expires_at);
/// # Ok(())
/// # }
/// ```

pub mod extract;
pub mod ownership;
pub mod password;
pub mod token;
