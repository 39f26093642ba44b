/// Bearer token model and database operations
///
/// Tokens are issued at login and presented on every authenticated request.
/// Only the SHA-256 digest of the token is stored, so a database leak does
/// not hand out live credentials. The plaintext token is returned once, at
/// issue time (see [`crate::auth::token`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_tokens (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash CHAR(64) NOT NULL UNIQUE,
///     token_prefix VARCHAR(16) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_used TIMESTAMPTZ,
///     revoked_at TIMESTAMPTZ
/// );
/// ```
///
/// # Lifecycle
///
/// ```text
/// Active ──(now > expires_at)──▶ Expired   (checked at validation time)
///   │
///   └──(logout / password change / admin)──▶ Revoked (is_active = false)
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::user::User;

/// Name of the unique constraint on `user_tokens.token_hash`
pub const TOKEN_HASH_CONSTRAINT: &str = "user_tokens_token_hash_key";

/// Stored bearer token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserToken {
    /// Token row ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// SHA-256 hex digest of the token
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// First characters of the token, for display in the admin UI
    pub token_prefix: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// When the token stops validating
    pub expires_at: DateTime<Utc>,

    /// False once revoked
    pub is_active: bool,

    /// Last successful validation
    pub last_used: Option<DateTime<Utc>>,

    /// When the token was revoked
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Input for storing a freshly generated token
#[derive(Debug, Clone)]
pub struct NewUserToken {
    pub user_id: i64,
    pub token_hash: String,
    pub token_prefix: String,
    pub expires_at: DateTime<Utc>,
}

/// Active token joined with its owner, as needed by request authentication
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenOwner {
    /// Token row ID
    pub token_id: i64,

    /// Token expiry
    pub token_expires_at: DateTime<Utc>,

    /// Owning user
    #[sqlx(flatten)]
    pub user: User,
}

/// Token state as seen at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

const TOKEN_COLUMNS: &str =
    "id, user_id, token_hash, token_prefix, created_at, expires_at, is_active, last_used, revoked_at";

impl UserToken {
    /// Whether the token is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Lifecycle state at `now`; revocation wins over expiry
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if !self.is_active {
            TokenState::Revoked
        } else if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Inserts a new active token
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`TOKEN_HASH_CONSTRAINT`] if the digest
    /// already exists.
    pub async fn insert(pool: &PgPool, data: NewUserToken) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, UserToken>(&format!(
            r#"
            INSERT INTO user_tokens (user_id, token_hash, token_prefix, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.token_hash)
        .bind(data.token_prefix)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    /// Checks whether a digest is already stored, active or not
    pub async fn hash_exists(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_tokens WHERE token_hash = $1)")
                .bind(token_hash)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Finds a token by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, UserToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM user_tokens WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Looks up an active token by digest, together with its owner
    ///
    /// Expiry is not filtered here; the caller decides (and logs) it.
    pub async fn find_active_owner(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<TokenOwner>, sqlx::Error> {
        let row = sqlx::query_as::<_, TokenOwner>(
            r#"
            SELECT t.id AS token_id, t.expires_at AS token_expires_at,
                   u.id, u.username, u.password_hash, u.is_active, u.is_staff,
                   u.date_joined, u.last_login_at
            FROM user_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_hash = $1 AND t.is_active = TRUE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    /// Stamps `last_used` with the current time
    pub async fn touch(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE user_tokens SET last_used = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes a single token
    ///
    /// Returns false if the token doesn't exist or was already revoked.
    pub async fn revoke(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_tokens
            SET is_active = FALSE, revoked_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every active token of a user except `keep_id`
    ///
    /// Returns the number of revoked tokens.
    pub async fn revoke_all_for_user_except(
        pool: &PgPool,
        user_id: i64,
        keep_id: Option<i64>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_tokens
            SET is_active = FALSE, revoked_at = NOW()
            WHERE user_id = $1
              AND is_active = TRUE
              AND ($2::BIGINT IS NULL OR id <> $2)
            "#,
        )
        .bind(user_id)
        .bind(keep_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists all tokens, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tokens = sqlx::query_as::<_, UserToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM user_tokens ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tokens)
    }

    /// Counts all stored tokens
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_tokens")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Deletes tokens that expired, or were revoked, before `cutoff`
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_stale(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_tokens
            WHERE expires_at < $1
               OR (is_active = FALSE AND revoked_at IS NOT NULL AND revoked_at < $1)
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: DateTime<Utc>, is_active: bool) -> UserToken {
        UserToken {
            id: 1,
            user_id: 1,
            token_hash: "0".repeat(64),
            token_prefix: "abcdefgh".to_string(),
            created_at: Utc::now(),
            expires_at,
            is_active,
            last_used: None,
            revoked_at: None,
        }
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let now = Utc::now();
        let t = token(now, true);

        assert!(!t.is_expired_at(now));
        assert!(t.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_state_at() {
        let now = Utc::now();

        assert_eq!(token(now + Duration::days(1), true).state_at(now), TokenState::Active);
        assert_eq!(token(now - Duration::days(1), true).state_at(now), TokenState::Expired);
        assert_eq!(token(now + Duration::days(1), false).state_at(now), TokenState::Revoked);
        assert_eq!(token(now - Duration::days(1), false).state_at(now), TokenState::Revoked);
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let json = serde_json::to_value(token(Utc::now(), true)).unwrap();
        assert!(json.get("token_hash").is_none());
        assert_eq!(json["token_prefix"], "abcdefgh");
    }
}
