/// Bearer token issuance, validation and revocation
///
/// Tokens are opaque random strings over `[A-Za-z0-9]`, 256 characters by
/// default. The server keeps only the SHA-256 digest of each token, so
/// looking a token up by its exact value is looking it up by digest.
///
/// # Flow
///
/// ```text
/// issue(username, password)
///   ├─ user missing / inactive / wrong password ──▶ InvalidCredentials(reason)
///   ├─ generate + hash, retry on digest collision
///   ├─ INSERT user_tokens (expires_at = now + lifetime)
///   └─ users.last_login_at = now
///
/// validate(token)
///   ├─ not found / revoked / expired / inactive owner ──▶ None
///   └─ last_used = now (best-effort) ──▶ Some(user)
/// ```
///
/// # Example
///
/// ```no_run
/// use quill_shared::auth::token::{issue, validate, TokenPolicy};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let issued = issue(&pool, "alice", "s3cret", &TokenPolicy::default()).await?;
///
/// let auth = validate(&pool, issued.token()).await?;
/// assert_eq!(auth.map(|a| a.user.id), Some(issued.user_id));
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use super::password::{hash_password_async, verify_password_async, PasswordError};
use crate::db::is_unique_violation;
use crate::models::token::{NewUserToken, UserToken, TOKEN_HASH_CONSTRAINT};
use crate::models::user::User;

/// Default token length in characters
pub const DEFAULT_TOKEN_LENGTH: usize = 256;

/// Shortest token length the server will issue
pub const MIN_TOKEN_LENGTH: usize = 32;

/// Longest token length; also the longest string accepted for lookup
pub const MAX_TOKEN_LENGTH: usize = 256;

/// Default token lifetime in days
pub const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 7;

/// Characters of the plaintext token kept for display
pub const TOKEN_PREFIX_LENGTH: usize = 8;

/// Upper bound on regenerations when a digest collides
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// How tokens are minted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Token length in characters
    pub length: usize,

    /// Time from issue to expiry
    pub lifetime: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_TOKEN_LENGTH,
            lifetime: Duration::days(DEFAULT_TOKEN_LIFETIME_DAYS),
        }
    }
}

/// Why a login was refused
///
/// Never shown to the client; only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    UserNotFound,
    Inactive,
    InvalidPassword,
}

impl LoginFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginFailure::UserNotFound => "user_not_found",
            LoginFailure::Inactive => "inactive",
            LoginFailure::InvalidPassword => "invalid_password",
        }
    }
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Login refused; the display message is the same for every reason
    #[error("Invalid credentials")]
    InvalidCredentials(LoginFailure),

    /// Password change refused
    #[error("Invalid old password")]
    InvalidOldPassword,

    /// Every generated token collided with a stored one
    #[error("Failed to generate a unique token after {0} attempts")]
    Exhausted(usize),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Freshly issued token
///
/// The plaintext only exists here; `Debug` prints the display prefix.
#[derive(Clone)]
pub struct IssuedToken {
    token: String,
    pub token_id: i64,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
}

impl IssuedToken {
    /// Plaintext token to hand to the client
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &format!("{}…", token_prefix(&self.token)))
            .field("token_id", &self.token_id)
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}

/// Caller identity established from a valid token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token_id: i64,
    pub token_expires_at: DateTime<Utc>,
}

/// Generates a random alphanumeric token of `length` characters
///
/// `thread_rng` is a CSPRNG seeded from the OS.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 digest of a token (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Leading characters of a token, safe to display
pub fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LENGTH).collect()
}

/// Cheap shape check before touching the database
///
/// Anything the server could have issued passes; garbage is rejected
/// without a query.
pub fn is_well_formed(token: &str) -> bool {
    (MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&token.len())
        && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Authenticates a username/password pair and issues a token
///
/// # Errors
///
/// - `TokenError::InvalidCredentials` when the user is unknown, inactive, or
///   the password doesn't match (checked in that order)
/// - `TokenError::Exhausted` when no unique token could be generated
pub async fn issue(
    pool: &PgPool,
    username: &str,
    password: &str,
    policy: &TokenPolicy,
) -> Result<IssuedToken, TokenError> {
    let user = User::find_by_username(pool, username)
        .await?
        .ok_or(TokenError::InvalidCredentials(LoginFailure::UserNotFound))?;

    if !user.is_active {
        return Err(TokenError::InvalidCredentials(LoginFailure::Inactive));
    }

    if !verify_password_async(password.to_string(), user.password_hash.clone()).await? {
        return Err(TokenError::InvalidCredentials(LoginFailure::InvalidPassword));
    }

    let (row, token) = create_for_user(pool, user.id, policy).await?;

    if let Err(e) = User::update_last_login(pool, user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to record last login");
    }

    tracing::debug!(
        user_id = user.id,
        token_id = row.id,
        expires_at = %row.expires_at,
        "Token issued"
    );

    Ok(IssuedToken {
        token,
        token_id: row.id,
        expires_at: row.expires_at,
        user_id: user.id,
        username: user.username,
    })
}

/// Mints and stores a token for `user_id` without checking credentials
///
/// Returns the stored row and the plaintext token.
pub async fn create_for_user(
    pool: &PgPool,
    user_id: i64,
    policy: &TokenPolicy,
) -> Result<(UserToken, String), TokenError> {
    for attempt in 1..=MAX_ISSUE_ATTEMPTS {
        let token = generate_token(policy.length);
        let token_hash = hash_token(&token);

        if UserToken::hash_exists(pool, &token_hash).await? {
            tracing::warn!(user_id, attempt, "Generated token already exists, regenerating");
            continue;
        }

        let new_token = NewUserToken {
            user_id,
            token_hash,
            token_prefix: token_prefix(&token),
            expires_at: Utc::now() + policy.lifetime,
        };

        match UserToken::insert(pool, new_token).await {
            Ok(row) => return Ok((row, token)),
            Err(e) if is_unique_violation(&e, Some(TOKEN_HASH_CONSTRAINT)) => {
                tracing::warn!(user_id, attempt, "Token insert collided, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(TokenError::Exhausted(MAX_ISSUE_ATTEMPTS))
}

/// Resolves a presented token to its owner
///
/// Returns `None` when the token is unknown, revoked, expired, or belongs to
/// an inactive user. On success `last_used` is stamped; a failure there is
/// logged and ignored.
pub async fn validate(pool: &PgPool, token: &str) -> Result<Option<AuthenticatedUser>, sqlx::Error> {
    if !is_well_formed(token) {
        tracing::debug!(len = token.len(), "Rejected malformed token");
        return Ok(None);
    }

    let Some(owner) = UserToken::find_active_owner(pool, &hash_token(token)).await? else {
        tracing::debug!(prefix = %token_prefix(token), "Token not found or revoked");
        return Ok(None);
    };

    if Utc::now() > owner.token_expires_at {
        tracing::debug!(token_id = owner.token_id, "Token expired");
        return Ok(None);
    }

    if !owner.user.is_active {
        tracing::debug!(token_id = owner.token_id, user_id = owner.user.id, "Token owner inactive");
        return Ok(None);
    }

    if let Err(e) = UserToken::touch(pool, owner.token_id).await {
        tracing::warn!(token_id = owner.token_id, error = %e, "Failed to update token last_used");
    }

    Ok(Some(AuthenticatedUser {
        user: owner.user,
        token_id: owner.token_id,
        token_expires_at: owner.token_expires_at,
    }))
}

/// Revokes one token
///
/// Returns false if it was already revoked or doesn't exist.
pub async fn revoke(pool: &PgPool, token_id: i64) -> Result<bool, sqlx::Error> {
    let revoked = UserToken::revoke(pool, token_id).await?;
    tracing::debug!(token_id, revoked, "Token revocation");
    Ok(revoked)
}

/// Changes a user's password after checking the old one
///
/// With `revoke_others`, every other active token of the user is revoked
/// afterwards; `keep_token_id` (the token that authorised the change)
/// stays valid. Revocation is best-effort: the password is already changed
/// when it runs, so a failure is logged rather than returned.
///
/// Returns the number of revoked tokens.
///
/// # Errors
///
/// `TokenError::InvalidOldPassword` if `old_password` doesn't match; nothing
/// is changed in that case.
pub async fn change_password(
    pool: &PgPool,
    user: &User,
    old_password: &str,
    new_password: &str,
    keep_token_id: Option<i64>,
    revoke_others: bool,
) -> Result<u64, TokenError> {
    if !verify_password_async(old_password.to_string(), user.password_hash.clone()).await? {
        return Err(TokenError::InvalidOldPassword);
    }

    let new_hash = hash_password_async(new_password.to_string()).await?;
    User::set_password_hash(pool, user.id, &new_hash).await?;

    if !revoke_others {
        return Ok(0);
    }

    match UserToken::revoke_all_for_user_except(pool, user.id, keep_token_id).await {
        Ok(count) => Ok(count),
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Failed to revoke tokens after password change");
            Ok(0)
        }
    }
}

/// Deletes tokens that expired or were revoked more than `retention` ago
pub async fn purge_stale(pool: &PgPool, retention: Duration) -> Result<u64, sqlx::Error> {
    UserToken::purge_stale(pool, Utc::now() - retention).await
}
