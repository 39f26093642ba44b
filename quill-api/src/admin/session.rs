/// Cookie sessions for the admin UI
///
/// The cookie holds only a random session ID; the session row links it to a
/// user and an expiry. The cookie is HttpOnly and SameSite=Strict, so
/// cross-site form posts never carry it.

use super::{html, AdminResult, StaffUser};
use crate::{app::AppState, extract::ClientIp};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use quill_shared::{
    auth::password::verify_password_async,
    models::{admin_session::AdminSession, user::User},
};
use serde::Deserialize;
use uuid::Uuid;

/// Session cookie name
pub const SESSION_COOKIE: &str = "quill_admin";

/// Admin login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/admin")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

fn login_form(error: Option<&str>, username: &str) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, html::escape(e)))
        .unwrap_or_default();

    format!(
        r#"{error}
<form method="post" action="/admin/login">
<p><label>Username<br><input name="username" value="{}" autofocus required></label></p>
<p><label>Password<br><input name="password" type="password" required></label></p>
<p><button type="submit">Log in</button></p>
</form>"#,
        html::escape(username)
    )
}

/// Resolves the session cookie to a staff user
///
/// Requests without a live session are redirected to the login page.
pub async fn require_staff(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(id) = session_id(&jar) else {
        return Redirect::to("/admin/login").into_response();
    };

    match AdminSession::find_staff_user(&state.db, id).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(StaffUser(user));
            next.run(req).await
        }
        Ok(None) => Redirect::to("/admin/login").into_response(),
        Err(e) => super::AdminError::from(e).into_response(),
    }
}

/// GET /admin/login
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> AdminResult<Response> {
    if let Some(id) = session_id(&jar) {
        if AdminSession::find_staff_user(&state.db, id).await?.is_some() {
            return Ok(Redirect::to("/admin").into_response());
        }
    }

    Ok(html::page("Log in", None, &login_form(None, "")).into_response())
}

/// POST /admin/login
///
/// Only active staff users get a session. Every failure renders the same
/// message.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    client_ip: ClientIp,
    Form(form): Form<LoginForm>,
) -> AdminResult<Response> {
    let user = User::find_by_username(&state.db, &form.username).await?;

    let failure = match &user {
        None => Some("user_not_found"),
        Some(u) if !u.is_active => Some("inactive"),
        Some(u) if !u.is_staff => Some("not_staff"),
        Some(u) => {
            if verify_password_async(form.password.clone(), u.password_hash.clone()).await? {
                None
            } else {
                Some("invalid_password")
            }
        }
    };

    let user = match (failure, user) {
        (None, Some(user)) => user,
        (reason, _) => {
            tracing::warn!(
                username = %form.username,
                reason = reason.unwrap_or("unknown"),
                client_ip = client_ip.as_deref().unwrap_or("-"),
                "Admin login failed"
            );
            let body = login_form(Some("Invalid credentials"), &form.username);
            return Ok((StatusCode::UNAUTHORIZED, html::page("Log in", None, &body)).into_response());
        }
    };

    let expires_at = Utc::now() + Duration::hours(state.config.admin.session_hours);
    let session = AdminSession::create(&state.db, user.id, expires_at).await?;

    tracing::info!(
        user_id = user.id,
        username = %user.username,
        client_ip = client_ip.as_deref().unwrap_or("-"),
        "Admin login"
    );

    let jar = jar.add(session_cookie(
        session.id.to_string(),
        state.config.api.production,
    ));

    Ok((jar, Redirect::to("/admin")).into_response())
}

/// POST /admin/logout
pub async fn logout(
    State(state): State<AppState>,
    axum::Extension(StaffUser(user)): axum::Extension<StaffUser>,
    jar: CookieJar,
) -> AdminResult<Response> {
    if let Some(id) = session_id(&jar) {
        AdminSession::delete(&state.db, id).await?;
    }

    tracing::info!(user_id = user.id, username = %user.username, "Admin logout");

    let jar = jar.remove(session_cookie(String::new(), state.config.api.production));
    Ok((jar, Redirect::to("/admin/login")).into_response())
}
