/// Admin pages and form actions
///
/// Listing pages render HTML tables. Actions are plain form POSTs that
/// redirect back to their listing on success.

use super::{
    html::{self, escape, flag, pager, post_button, Table},
    AdminError, AdminResult, PageQuery, StaffUser, PAGE_SIZE,
};
use crate::app::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Extension, Form,
};
use chrono::{DateTime, Utc};
use quill_shared::{
    audit::{self, CrudOperation, Resource},
    db::is_unique_violation,
    models::{
        article::{Article, UpdateArticle},
        category::{Category, NAME_CONSTRAINT},
        comment::Comment,
        token::UserToken,
        user::User,
    },
    slug::SlugScope,
};
use serde::Deserialize;
use serde_json::json;

/// Longest comment excerpt shown in the comments table
const EXCERPT_CHARS: usize = 80;

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn optional_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(timestamp).unwrap_or_else(|| "-".to_string())
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Drops the look-ahead row and reports whether it existed
fn split_page<T>(mut rows: Vec<T>) -> (Vec<T>, bool) {
    let has_next = rows.len() as i64 > PAGE_SIZE;
    rows.truncate(PAGE_SIZE as usize);
    (rows, has_next)
}

/// GET /admin
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
) -> AdminResult<Html<String>> {
    let counts = [
        ("Users", "/admin/users", User::count(&state.db).await?),
        ("Tokens", "/admin/tokens", UserToken::count(&state.db).await?),
        ("Categories", "/admin/categories", Category::count(&state.db).await?),
        ("Articles", "/admin/articles", Article::count(&state.db).await?),
        ("Comments", "/admin/comments", Comment::count(&state.db).await?),
    ];

    let cards: String = counts
        .iter()
        .map(|(label, href, count)| {
            format!(r#"<a class="card" href="{href}"><strong>{count}</strong>{label}</a>"#)
        })
        .collect();

    Ok(html::page(
        "Dashboard",
        Some(&staff.username),
        &format!(r#"<div class="cards">{cards}</div>"#),
    ))
}

/// GET /admin/users
pub async fn users(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Query(query): Query<PageQuery>,
) -> AdminResult<Html<String>> {
    let (limit, offset) = query.window();
    let (users, has_next) = split_page(User::list(&state.db, limit, offset).await?);

    let mut table = Table::new(&["ID", "Username", "Active", "Staff", "Joined", "Last login", ""]);
    for user in &users {
        let actions = if user.id == staff.id {
            r#"<span class="muted">you</span>"#.to_string()
        } else {
            format!(
                "{} {}",
                post_button(
                    &format!("/admin/users/{}/active", user.id),
                    if user.is_active { "Deactivate" } else { "Activate" },
                ),
                post_button(
                    &format!("/admin/users/{}/staff", user.id),
                    if user.is_staff { "Remove staff" } else { "Make staff" },
                ),
            )
        };

        table.row(vec![
            user.id.to_string(),
            escape(&user.username),
            flag(user.is_active),
            flag(user.is_staff),
            timestamp(user.date_joined),
            optional_timestamp(user.last_login_at),
            actions,
        ]);
    }

    let body = table.render() + &pager("/admin/users", query.page(), has_next);
    Ok(html::page("Users", Some(&staff.username), &body))
}

async fn load_user(state: &AppState, staff: &User, id: i64) -> AdminResult<User> {
    if id == staff.id {
        return Err(AdminError::BadRequest(
            "You cannot change your own account from the admin".to_string(),
        ));
    }

    User::find_by_id(&state.db, id)
        .await?
        .ok_or(AdminError::NotFound("User not found"))
}

/// POST /admin/users/:id/active
pub async fn toggle_user_active(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    let user = load_user(&state, &staff, id).await?;
    User::set_active(&state.db, id, !user.is_active).await?;

    audit::crud_operation(
        CrudOperation::Update,
        Resource::User,
        &staff,
        id,
        json!({ "via": "admin", "is_active": !user.is_active }),
    );

    Ok(Redirect::to("/admin/users"))
}

/// POST /admin/users/:id/staff
pub async fn toggle_user_staff(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    let user = load_user(&state, &staff, id).await?;
    User::set_staff(&state.db, id, !user.is_staff).await?;

    audit::crud_operation(
        CrudOperation::Update,
        Resource::User,
        &staff,
        id,
        json!({ "via": "admin", "is_staff": !user.is_staff }),
    );

    Ok(Redirect::to("/admin/users"))
}

/// GET /admin/tokens
///
/// Only the stored prefix is shown; the token itself is never stored.
pub async fn tokens(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Query(query): Query<PageQuery>,
) -> AdminResult<Html<String>> {
    let (limit, offset) = query.window();
    let (tokens, has_next) = split_page(UserToken::list(&state.db, limit, offset).await?);
    let now = Utc::now();

    let mut table = Table::new(&[
        "ID", "User ID", "Prefix", "Created", "Expires", "Last used", "State", "",
    ]);
    for token in &tokens {
        let state_label = format!("{:?}", token.state_at(now)).to_lowercase();
        let actions = if token.is_active {
            post_button(&format!("/admin/tokens/{}/revoke", token.id), "Revoke")
        } else {
            String::new()
        };

        table.row(vec![
            token.id.to_string(),
            token.user_id.to_string(),
            format!("<code>{}…</code>", escape(&token.token_prefix)),
            timestamp(token.created_at),
            timestamp(token.expires_at),
            optional_timestamp(token.last_used),
            state_label,
            actions,
        ]);
    }

    let body = table.render() + &pager("/admin/tokens", query.page(), has_next);
    Ok(html::page("Tokens", Some(&staff.username), &body))
}

/// POST /admin/tokens/:id/revoke
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    if !UserToken::revoke(&state.db, id).await? {
        return Err(AdminError::NotFound("Token not found or already revoked"));
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Token,
        &staff,
        id,
        json!({ "via": "admin" }),
    );

    Ok(Redirect::to("/admin/tokens"))
}

/// New category form
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// GET /admin/categories
pub async fn categories(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
) -> AdminResult<Html<String>> {
    let categories = Category::list(&state.db).await?;

    let mut table = Table::new(&["ID", "Name", "Slug", "Description", "Created", ""]);
    for category in &categories {
        table.row(vec![
            category.id.to_string(),
            escape(&category.name),
            escape(&category.slug),
            escape(&category.description),
            timestamp(category.created_at),
            post_button(&format!("/admin/categories/{}/delete", category.id), "Delete"),
        ]);
    }

    let form = r#"<h2>New category</h2>
<form method="post" action="/admin/categories">
<p><label>Name<br><input name="name" maxlength="100" required></label></p>
<p><label>Description<br><textarea name="description" rows="3" cols="60"></textarea></label></p>
<p><button type="submit">Create</button></p>
</form>"#;

    let body = table.render() + form;
    Ok(html::page("Categories", Some(&staff.username), &body))
}

/// POST /admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Form(form): Form<CategoryForm>,
) -> AdminResult<Redirect> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > SlugScope::Categories.max_len() {
        return Err(AdminError::BadRequest(
            "Name must be 1-100 characters".to_string(),
        ));
    }

    let description = form.description.trim();
    let category = match Category::create_with_slug(&state.db, name, name, description).await {
        Ok(category) => category,
        Err(e) if is_unique_violation(&e, Some(NAME_CONSTRAINT)) => {
            return Err(AdminError::BadRequest(
                "A category with that name already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    audit::crud_operation(
        CrudOperation::Create,
        Resource::Category,
        &staff,
        category.id,
        json!({ "via": "admin", "name": category.name }),
    );

    Ok(Redirect::to("/admin/categories"))
}

/// POST /admin/categories/:id/delete
///
/// Articles in the category are kept and become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    if !Category::delete(&state.db, id).await? {
        return Err(AdminError::NotFound("Category not found"));
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Category,
        &staff,
        id,
        json!({ "via": "admin" }),
    );

    Ok(Redirect::to("/admin/categories"))
}

/// GET /admin/articles
pub async fn articles(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Query(query): Query<PageQuery>,
) -> AdminResult<Html<String>> {
    let (limit, offset) = query.window();
    let (articles, has_next) = split_page(Article::list_all(&state.db, limit, offset).await?);

    let mut table = Table::new(&[
        "ID", "Title", "Slug", "Author", "Category", "Published", "Updated", "",
    ]);
    for article in &articles {
        let actions = format!(
            "{} {}",
            post_button(
                &format!("/admin/articles/{}/published", article.id),
                if article.published { "Unpublish" } else { "Publish" },
            ),
            post_button(&format!("/admin/articles/{}/delete", article.id), "Delete"),
        );

        table.row(vec![
            article.id.to_string(),
            escape(&article.title),
            escape(&article.slug),
            escape(&article.author_username),
            article
                .category_name
                .as_deref()
                .map(escape)
                .unwrap_or_else(|| "-".to_string()),
            flag(article.published),
            timestamp(article.updated_at),
            actions,
        ]);
    }

    let body = table.render() + &pager("/admin/articles", query.page(), has_next);
    Ok(html::page("Articles", Some(&staff.username), &body))
}

/// POST /admin/articles/:id/published
pub async fn toggle_article_published(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    let article = Article::find_by_id(&state.db, id)
        .await?
        .ok_or(AdminError::NotFound("Article not found"))?;

    let update = UpdateArticle {
        published: Some(!article.published),
        ..Default::default()
    };
    Article::update(&state.db, id, update)
        .await?
        .ok_or(AdminError::NotFound("Article not found"))?;

    audit::crud_operation(
        CrudOperation::Update,
        Resource::Article,
        &staff,
        id,
        json!({ "via": "admin", "published": !article.published }),
    );

    Ok(Redirect::to("/admin/articles"))
}

/// POST /admin/articles/:id/delete
pub async fn delete_article(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    if !Article::delete(&state.db, id).await? {
        return Err(AdminError::NotFound("Article not found"));
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Article,
        &staff,
        id,
        json!({ "via": "admin" }),
    );

    Ok(Redirect::to("/admin/articles"))
}

/// GET /admin/comments
pub async fn comments(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Query(query): Query<PageQuery>,
) -> AdminResult<Html<String>> {
    let (limit, offset) = query.window();
    let (comments, has_next) = split_page(Comment::list_all(&state.db, limit, offset).await?);

    let mut table = Table::new(&["ID", "Article", "Author", "Comment", "Created", ""]);
    for comment in &comments {
        table.row(vec![
            comment.id.to_string(),
            escape(&comment.article_title),
            escape(&comment.author_username),
            escape(&excerpt(&comment.content)),
            timestamp(comment.created_at),
            post_button(&format!("/admin/comments/{}/delete", comment.id), "Delete"),
        ]);
    }

    let body = table.render() + &pager("/admin/comments", query.page(), has_next);
    Ok(html::page("Comments", Some(&staff.username), &body))
}

/// POST /admin/comments/:id/delete
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(StaffUser(staff)): Extension<StaffUser>,
    Path(id): Path<i64>,
) -> AdminResult<Redirect> {
    if !Comment::delete(&state.db, id).await? {
        return Err(AdminError::NotFound("Comment not found"));
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Comment,
        &staff,
        id,
        json!({ "via": "admin" }),
    );

    Ok(Redirect::to("/admin/comments"))
}
