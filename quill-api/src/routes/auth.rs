/// Account endpoints
///
/// # Endpoints
///
/// - `POST /api/blog/register` - Create an account
/// - `POST /api/blog/login` - Exchange credentials for a bearer token
/// - `POST /api/blog/logout` - Revoke the presenting token (authenticated)
/// - `POST /api/blog/change-password` - Change password (authenticated)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ClientIp, ValidJson},
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use quill_shared::{
    audit::{self, UserAction},
    auth::{extract::AuthContext, password, token, token::TokenError},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Letters, digits and `@ . + - _`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let ok = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_chars");
        err.message = Some("Username may only contain letters, digits and @/./+/-/_".into());
        Err(err)
    }
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 128, message = "Password must be 1-128 characters"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token, shown only here
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, max = 128, message = "New password must be 1-128 characters"))]
    pub new_password: String,
}

/// Plain message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Register a new user
///
/// ```text
/// POST /api/blog/register
/// { "username": "alice", "password": "s3cret" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Username already taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    client_ip: ClientIp,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    if User::username_exists(&state.db, &req.username).await? {
        tracing::warn!(username = %req.username, reason = "username_exists", "Registration failed");
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    let password_hash = password::hash_password_async(req.password).await?;

    // A concurrent registration can still win; the unique constraint maps to the same 400
    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            password_hash,
        },
    )
    .await?;

    audit::user_action(UserAction::Register, &user, client_ip.as_deref());

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id: user.id,
    }))
}

/// Log in and receive a bearer token
///
/// ```text
/// POST /api/blog/login
/// { "username": "alice", "password": "s3cret" }
/// ```
///
/// ```json
/// {
///   "token": "<256 alphanumeric characters>",
///   "expires_at": "2025-01-17T12:00:00Z",
///   "user_id": 1,
///   "username": "alice"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user, inactive account or wrong password
///   (same message for all three)
pub async fn login(
    State(state): State<AppState>,
    client_ip: ClientIp,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let policy = state.config.tokens.policy();

    let issued = match token::issue(&state.db, &req.username, &req.password, &policy).await {
        Ok(issued) => issued,
        Err(TokenError::InvalidCredentials(reason)) => {
            audit::login_failed(&req.username, reason, client_ip.as_deref());
            return Err(TokenError::InvalidCredentials(reason).into());
        }
        Err(e) => return Err(e.into()),
    };

    audit::login_succeeded(&issued, client_ip.as_deref());

    Ok(Json(LoginResponse {
        token: issued.token().to_string(),
        expires_at: issued.expires_at,
        user_id: issued.user_id,
        username: issued.username,
    }))
}

/// Revoke the token used for this request
///
/// ```text
/// POST /api/blog/logout
/// Authorization: Bearer <token>
/// ```
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    client_ip: ClientIp,
) -> ApiResult<Json<MessageResponse>> {
    token::revoke(&state.db, auth.token_id).await?;

    audit::user_action(UserAction::Logout, &auth.user, client_ip.as_deref());

    Ok(MessageResponse::new("Logged out"))
}

/// Change the caller's password
///
/// ```text
/// POST /api/blog/change-password
/// Authorization: Bearer <token>
/// { "old_password": "s3cret", "new_password": "n3w" }
/// ```
///
/// The presenting token stays valid. Unless disabled in config, the user's
/// other tokens are revoked.
///
/// # Errors
///
/// - `401 Unauthorized`: Old password doesn't match (nothing is changed)
/// - `422 Unprocessable Entity`: Validation failed
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    client_ip: ClientIp,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let revoked = match token::change_password(
        &state.db,
        &auth.user,
        &req.old_password,
        &req.new_password,
        Some(auth.token_id),
        state.config.tokens.revoke_on_password_change,
    )
    .await
    {
        Ok(revoked) => revoked,
        Err(TokenError::InvalidOldPassword) => {
            tracing::warn!(
                user_id = auth.user.id,
                reason = "invalid_old_password",
                "Password change failed"
            );
            return Err(TokenError::InvalidOldPassword.into());
        }
        Err(e) => return Err(e.into()),
    };

    audit::user_action(UserAction::ChangePassword, &auth.user, client_ip.as_deref());
    tracing::info!(user_id = auth.user.id, revoked_tokens = revoked, "Password changed");

    Ok(MessageResponse::new("Password changed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            username: "alice.b+blog@x_y-z".to_string(),
            password: "pw".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_chars = RegisterRequest {
            username: "alice smith".to_string(),
            password: "pw".to_string(),
        };
        assert!(bad_chars.validate().is_err());

        let too_long = RegisterRequest {
            username: "a".repeat(151),
            password: "pw".to_string(),
        };
        assert!(too_long.validate().is_err());

        let empty_password = RegisterRequest {
            username: "alice".to_string(),
            password: String::new(),
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_login_request_validation() {
        let req = LoginRequest {
            username: String::new(),
            password: "pw".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_change_password_request_validation() {
        let req = ChangePasswordRequest {
            old_password: "old".to_string(),
            new_password: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_login_request_ignores_token_field() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username": "a", "password": "b", "token": "t"}"#).unwrap();
        assert_eq!(req.username, "a");
    }
}
