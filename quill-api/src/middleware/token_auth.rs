/// Bearer token authentication middleware
///
/// Applied with `route_layer` to the write routes. A request is
/// authenticated when either:
///
/// 1. the `Authorization: Bearer <token>` header holds a valid token, or
/// 2. for POST, PUT and PATCH, the JSON body has a valid `token` field.
///
/// The header is tried first. If it is missing or its token doesn't
/// validate, the body is buffered (up to `api.max_body_bytes`), searched for a
/// token, and re-attached unchanged so the handler can still read it.
///
/// On success an [`AuthContext`] is inserted into request extensions.
/// Every failure produces the same 401.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use quill_shared::auth::{
    extract::{accepts_body_token, bearer_token, body_token, AuthContext, TokenSource},
    token,
};

use crate::{app::AppState, error::ApiError};

/// Token authentication layer
///
/// # Errors
///
/// - `401 Unauthorized` when no source yields a valid token
/// - `400 Bad Request` when the body exceeds the configured limit
/// - `500 Internal Server Error` when the token store can't be queried
pub async fn token_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    if let Some(presented) = bearer_token(&parts.headers).map(str::to_owned) {
        if let Some(auth) = token::validate(&state.db, &presented).await? {
            tracing::debug!(user_id = auth.user.id, source = "header", "Request authenticated");
            parts
                .extensions
                .insert(AuthContext::new(auth, TokenSource::Header));
            return Ok(next.run(Request::from_parts(parts, body)).await);
        }

        tracing::debug!(method = %parts.method, path = %parts.uri.path(), "Header token rejected");
    }

    if !accepts_body_token(&parts.method) {
        return Err(ApiError::unauthenticated());
    }

    let bytes = axum::body::to_bytes(body, state.config.api.max_body_bytes)
        .await
        .map_err(|_| ApiError::BadRequest("Request body too large".to_string()))?;

    let Some(presented) = body_token(&parts.method, &bytes) else {
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), "No usable token");
        return Err(ApiError::unauthenticated());
    };

    let Some(auth) = token::validate(&state.db, &presented).await? else {
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), "Body token rejected");
        return Err(ApiError::unauthenticated());
    };

    tracing::debug!(user_id = auth.user.id, source = "body", "Request authenticated");
    parts
        .extensions
        .insert(AuthContext::new(auth, TokenSource::Body));

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
