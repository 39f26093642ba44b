/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS and secure cookies (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `TOKEN_LENGTH`: Bearer token length, 32..=256 (default: 256)
/// - `TOKEN_LIFETIME_DAYS`: Bearer token lifetime (default: 7)
/// - `TOKEN_SWEEP_INTERVAL_SECS`: Stale token cleanup period, 0 disables (default: 3600)
/// - `TOKEN_RETENTION_DAYS`: How long dead tokens are kept before cleanup (default: 30)
/// - `REVOKE_TOKENS_ON_PASSWORD_CHANGE`: Revoke other tokens on password change (default: true)
/// - `MAX_BODY_BYTES`: Request body limit (default: 1048576)
/// - `ADMIN_SESSION_HOURS`: Admin UI session lifetime (default: 12)
/// - `ADMIN_USERNAME` / `ADMIN_PASSWORD`: Staff account ensured at startup (optional, both or neither)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for text (read in `main`)
///
/// # Example
///
/// ```no_run
/// use quill_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use quill_shared::auth::token::{
    TokenPolicy, DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_LIFETIME_DAYS, MAX_TOKEN_LENGTH,
    MIN_TOKEN_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;
const MAX_RETENTION_DAYS: i64 = 36500;
const MAX_SESSION_HOURS: i64 = 8760;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Bearer token configuration
    pub tokens: TokenConfig,

    /// Admin UI configuration
    pub admin: AdminConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode (HSTS, secure cookies)
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Bearer token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token length in characters
    pub length: usize,

    /// Days from issue to expiry
    pub lifetime_days: i64,

    /// Seconds between stale-token sweeps; 0 disables the sweeper
    pub sweep_interval_secs: u64,

    /// Days an expired or revoked token is kept before the sweeper deletes it
    pub retention_days: i64,

    /// Revoke the user's other tokens when they change their password
    pub revoke_on_password_change: bool,
}

impl TokenConfig {
    /// Issuance policy derived from this config
    pub fn policy(&self) -> TokenPolicy {
        TokenPolicy {
            length: self.length,
            lifetime: Duration::days(self.lifetime_days),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }
}

/// Admin UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Admin session lifetime in hours
    pub session_hours: i64,

    /// Staff account to create or promote at startup
    #[serde(skip_serializing)]
    pub bootstrap: Option<AdminBootstrap>,
}

/// Credentials of the startup staff account
#[derive(Clone, Deserialize)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        _ => Ok(default),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> anyhow::Result<bool> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("Invalid value for {}: expected a boolean, got {}", key, v),
        },
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - A variable has an unparsable or out-of-range value
    /// - Only one of `ADMIN_USERNAME` / `ADMIN_PASSWORD` is set
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let token_length = parse_or(&lookup, "TOKEN_LENGTH", DEFAULT_TOKEN_LENGTH)?;
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&token_length) {
            anyhow::bail!(
                "TOKEN_LENGTH must be between {} and {}, got {}",
                MIN_TOKEN_LENGTH,
                MAX_TOKEN_LENGTH,
                token_length
            );
        }

        let lifetime_days = parse_or(&lookup, "TOKEN_LIFETIME_DAYS", DEFAULT_TOKEN_LIFETIME_DAYS)?;
        if !(1..=MAX_TOKEN_LIFETIME_DAYS).contains(&lifetime_days) {
            anyhow::bail!(
                "TOKEN_LIFETIME_DAYS must be between 1 and {}, got {}",
                MAX_TOKEN_LIFETIME_DAYS,
                lifetime_days
            );
        }

        let retention_days = parse_or(&lookup, "TOKEN_RETENTION_DAYS", 30i64)?;
        if !(0..=MAX_RETENTION_DAYS).contains(&retention_days) {
            anyhow::bail!(
                "TOKEN_RETENTION_DAYS must be between 0 and {}, got {}",
                MAX_RETENTION_DAYS,
                retention_days
            );
        }

        let session_hours = parse_or(&lookup, "ADMIN_SESSION_HOURS", 12i64)?;
        if !(1..=MAX_SESSION_HOURS).contains(&session_hours) {
            anyhow::bail!(
                "ADMIN_SESSION_HOURS must be between 1 and {}, got {}",
                MAX_SESSION_HOURS,
                session_hours
            );
        }

        let bootstrap = match (
            lookup("ADMIN_USERNAME").filter(|v| !v.is_empty()),
            lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        ) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080u16)?,
                production: parse_bool_or(&lookup, "API_PRODUCTION", false)?,
                cors_origins,
                max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", 1024 * 1024usize)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            tokens: TokenConfig {
                length: token_length,
                lifetime_days,
                sweep_interval_secs: parse_or(&lookup, "TOKEN_SWEEP_INTERVAL_SECS", 3600u64)?,
                retention_days,
                revoke_on_password_change: parse_bool_or(
                    &lookup,
                    "REVOKE_TOKENS_ON_PASSWORD_CHANGE",
                    true,
                )?,
            },
            admin: AdminConfig {
                session_hours,
                bootstrap,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgresql://localhost/quill_test");

    #[test]
    fn test_defaults() {
        let config = load(&[DB]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.api.max_body_bytes, 1024 * 1024);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.tokens.length, 256);
        assert_eq!(config.tokens.lifetime_days, 7);
        assert_eq!(config.tokens.sweep_interval_secs, 3600);
        assert_eq!(config.tokens.retention_days, 30);
        assert!(config.tokens.revoke_on_password_change);
        assert_eq!(config.admin.session_hours, 12);
        assert!(config.admin.bootstrap.is_none());
    }

    #[test]
    fn test_database_url_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            DB,
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("API_PRODUCTION", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("TOKEN_LENGTH", "64"),
            ("TOKEN_LIFETIME_DAYS", "1"),
            ("TOKEN_SWEEP_INTERVAL_SECS", "0"),
            ("REVOKE_TOKENS_ON_PASSWORD_CHANGE", "false"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "hunter2"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(config.api.production);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.tokens.policy().length, 64);
        assert_eq!(config.tokens.policy().lifetime, Duration::days(1));
        assert_eq!(config.tokens.sweep_interval_secs, 0);
        assert!(!config.tokens.revoke_on_password_change);

        let bootstrap = config.admin.bootstrap.unwrap();
        assert_eq!(bootstrap.username, "root");
        assert!(!format!("{:?}", bootstrap).contains("hunter2"));
    }

    #[test]
    fn test_token_length_bounds() {
        assert!(load(&[DB, ("TOKEN_LENGTH", "31")]).is_err());
        assert!(load(&[DB, ("TOKEN_LENGTH", "257")]).is_err());
        assert!(load(&[DB, ("TOKEN_LENGTH", "32")]).is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[DB, ("API_PORT", "eighty")]).is_err());
        assert!(load(&[DB, ("API_PRODUCTION", "maybe")]).is_err());
        assert!(load(&[DB, ("TOKEN_LIFETIME_DAYS", "0")]).is_err());
    }

    #[test]
    fn test_duration_bounds() {
        assert!(load(&[DB, ("TOKEN_LIFETIME_DAYS", "100000000")]).is_err());
        assert!(load(&[DB, ("TOKEN_LIFETIME_DAYS", "3650")]).is_ok());
        assert!(load(&[DB, ("TOKEN_RETENTION_DAYS", "-1")]).is_err());
        assert!(load(&[DB, ("TOKEN_RETENTION_DAYS", "100000000")]).is_err());
        assert!(load(&[DB, ("ADMIN_SESSION_HOURS", "0")]).is_err());
        assert!(load(&[DB, ("ADMIN_SESSION_HOURS", "100000000")]).is_err());

        let config = load(&[
            DB,
            ("TOKEN_LIFETIME_DAYS", "3650"),
            ("TOKEN_RETENTION_DAYS", "36500"),
        ])
        .unwrap();
        let now = chrono::Utc::now();
        assert!(now + config.tokens.policy().lifetime > now);
        assert!(now - config.tokens.retention() < now);
    }

    #[test]
    fn test_admin_bootstrap_needs_both() {
        assert!(load(&[DB, ("ADMIN_USERNAME", "root")]).is_err());
        assert!(load(&[DB, ("ADMIN_PASSWORD", "pw")]).is_err());
    }
}
