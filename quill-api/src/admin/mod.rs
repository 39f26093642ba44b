/// Staff admin UI served under `/admin`
///
/// Server-rendered HTML pages for managing users, tokens and blog content.
/// Access uses a cookie session (see [`session`]) rather than bearer tokens,
/// and only active staff users can sign in.
///
/// ```text
/// GET  /admin/login                         login form
/// POST /admin/login                         start a session
/// POST /admin/logout                        end the session
/// GET  /admin                               dashboard
/// GET  /admin/users                         users
/// POST /admin/users/:id/active              toggle is_active
/// POST /admin/users/:id/staff               toggle is_staff
/// GET  /admin/tokens                        tokens
/// POST /admin/tokens/:id/revoke             revoke a token
/// GET  /admin/categories                    categories + create form
/// POST /admin/categories                    create a category
/// POST /admin/categories/:id/delete         delete a category
/// GET  /admin/articles                      all articles, published or not
/// POST /admin/articles/:id/published        toggle published
/// POST /admin/articles/:id/delete           delete an article
/// GET  /admin/comments                      comments
/// POST /admin/comments/:id/delete           delete a comment
/// ```

pub mod html;
pub mod pages;
pub mod session;

use crate::app::AppState;
use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use quill_shared::{auth::password::PasswordError, models::user::User};
use serde::Deserialize;

/// Rows per admin listing page
pub const PAGE_SIZE: i64 = 50;

/// Highest page whose offset still fits in an `i64`
const MAX_PAGE: i64 = i64::MAX / PAGE_SIZE;

/// Staff user resolved from the session cookie
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

/// `?page=N` query for listings, 1-based
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Limit/offset pair; fetches one extra row to tell whether a next page exists
    pub fn window(&self) -> (i64, i64) {
        (PAGE_SIZE + 1, (self.page() - 1) * PAGE_SIZE)
    }
}

/// Admin error rendered as an HTML page
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Something went wrong")]
    Internal,
}

impl From<sqlx::Error> for AdminError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "Admin database error");
        AdminError::Internal
    }
}

impl From<PasswordError> for AdminError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "Admin password error");
        AdminError::Internal
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = format!(
            r#"<p class="error">{}</p><p><a href="/admin">Back to dashboard</a></p>"#,
            html::escape(&self.to_string())
        );

        (status, html::page("Error", None, &body)).into_response()
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Builds the `/admin` router; mount it with `nest("/admin", ...)`
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(pages::dashboard))
        .route("/users", get(pages::users))
        .route("/users/:id/active", post(pages::toggle_user_active))
        .route("/users/:id/staff", post(pages::toggle_user_staff))
        .route("/tokens", get(pages::tokens))
        .route("/tokens/:id/revoke", post(pages::revoke_token))
        .route("/categories", get(pages::categories).post(pages::create_category))
        .route("/categories/:id/delete", post(pages::delete_category))
        .route("/articles", get(pages::articles))
        .route("/articles/:id/published", post(pages::toggle_article_published))
        .route("/articles/:id/delete", post(pages::delete_article))
        .route("/comments", get(pages::comments))
        .route("/comments/:id/delete", post(pages::delete_comment))
        .route("/logout", post(session::logout))
        .route_layer(from_fn_with_state(state, session::require_staff));

    Router::new()
        .route("/login", get(session::login_page).post(session::login))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query() {
        assert_eq!(PageQuery::default().page(), 1);
        assert_eq!(PageQuery { page: Some(0) }.page(), 1);
        assert_eq!(PageQuery { page: Some(-4) }.page(), 1);

        assert_eq!(PageQuery { page: Some(1) }.window(), (51, 0));
        assert_eq!(PageQuery { page: Some(3) }.window(), (51, 100));
    }

    #[test]
    fn test_page_query_huge_page() {
        let query = PageQuery { page: Some(i64::MAX) };
        assert_eq!(query.page(), MAX_PAGE);

        let (limit, offset) = query.window();
        assert_eq!(limit, 51);
        assert!(offset >= 0);
    }

    #[test]
    fn test_admin_error_status() {
        assert_eq!(
            AdminError::NotFound("Gone").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::BadRequest("No".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::from(sqlx::Error::RowNotFound).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
