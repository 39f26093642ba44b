//! Audit events
//!
//! Account actions (register, login, logout, password change) and content
//! changes are emitted as structured `tracing` events at INFO level from
//! this module, so they can be filtered with `quill_shared::audit=info`.
//!
//! Failed logins carry the internal reason; clients only ever see the
//! generic message.

use std::fmt;

use crate::auth::token::{IssuedToken, LoginFailure};
use crate::models::user::User;

/// Account-level action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Register,
    Login,
    Logout,
    ChangePassword,
}

impl UserAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UserAction::Register => "register",
            UserAction::Login => "login",
            UserAction::Logout => "logout",
            UserAction::ChangePassword => "change_password",
        }
    }
}

/// Content mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOperation {
    Create,
    Update,
    Delete,
}

impl CrudOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            CrudOperation::Create => "create",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }
}

/// Audited resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Article,
    Comment,
    Category,
    User,
    Token,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Article => "Article",
            Resource::Comment => "Comment",
            Resource::Category => "Category",
            Resource::User => "User",
            Resource::Token => "Token",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records a successful account action
pub fn user_action(action: UserAction, user: &User, client_ip: Option<&str>) {
    tracing::info!(
        event = "user_action",
        action = action.as_str(),
        user_id = user.id,
        username = %user.username,
        client_ip = client_ip.unwrap_or("-"),
        "User action"
    );
}

/// Records a successful login together with the issued token
pub fn login_succeeded(issued: &IssuedToken, client_ip: Option<&str>) {
    tracing::info!(
        event = "user_action",
        action = UserAction::Login.as_str(),
        user_id = issued.user_id,
        username = %issued.username,
        token_id = issued.token_id,
        client_ip = client_ip.unwrap_or("-"),
        "User action"
    );
}

/// Records a refused login
pub fn login_failed(username: &str, reason: LoginFailure, client_ip: Option<&str>) {
    tracing::warn!(
        event = "login_failed",
        username = %username,
        reason = reason.as_str(),
        client_ip = client_ip.unwrap_or("-"),
        "Login failed"
    );
}

/// Records a content mutation
///
/// `details` is a short free-form JSON object (title, parent article, ...).
pub fn crud_operation(
    operation: CrudOperation,
    resource: Resource,
    user: &User,
    object_id: i64,
    details: serde_json::Value,
) {
    tracing::info!(
        event = "crud_operation",
        operation = operation.as_str(),
        model = resource.as_str(),
        user_id = user.id,
        username = %user.username,
        object_id,
        details = %details,
        "CRUD operation"
    );
}
