/// Where a bearer token can come from
///
/// Clients present their token in the `Authorization: Bearer <token>`
/// header. Form-style clients that can't set headers may instead put it in
/// a `token` field of the JSON body, which is only honoured on methods that
/// carry a body (POST, PUT, PATCH).
///
/// After a token validates, the request carries an [`AuthContext`] in its
/// extensions.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue, Method};
/// use quill_shared::auth::extract::{bearer_token, body_token};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
/// assert_eq!(bearer_token(&headers), Some("abc123"));
///
/// let body = br#"{"title": "Hi", "token": "abc123"}"#;
/// assert_eq!(body_token(&Method::POST, body), Some("abc123".to_string()));
/// assert_eq!(body_token(&Method::GET, body), None);
/// ```

use axum::http::{header, HeaderMap, Method};
use serde::Serialize;

use super::token::AuthenticatedUser;
use crate::models::user::User;

/// Where the accepted token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Header,
    Body,
}

impl TokenSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSource::Header => "header",
            TokenSource::Body => "body",
        }
    }
}

/// Authenticated caller, inserted into request extensions
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Token owner
    pub user: User,

    /// Token that authenticated this request
    pub token_id: i64,

    /// Where the token came from
    pub source: TokenSource,
}

impl AuthContext {
    pub fn new(auth: AuthenticatedUser, source: TokenSource) -> Self {
        Self {
            user: auth.user,
            token_id: auth.token_id,
            source,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

/// Reads the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively. Returns `None` for a missing
/// header, another scheme or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether `method` may carry a body token
pub fn accepts_body_token(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Reads the `token` field from a JSON object body
///
/// Returns `None` for other methods, non-JSON bodies, non-object bodies or a
/// `token` that isn't a non-empty string.
pub fn body_token(method: &Method, body: &[u8]) -> Option<String> {
    if !accepts_body_token(method) || body.is_empty() {
        return None;
    }

    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("token")? {
        serde_json::Value::String(token) if !token.is_empty() => Some(token.clone()),
        _ => None,
    }
}
