/// Article endpoints
///
/// Reads are public and only see published articles. Writes need a token;
/// update and delete are limited to the author.
///
/// # Endpoints
///
/// - `GET    /api/blog/articles?search=&category_id=` - List published articles
/// - `GET    /api/blog/articles/:id` - Get a published article
/// - `POST   /api/blog/articles` - Create an article
/// - `PUT    /api/blog/articles/:id` - Update an article (author only)
/// - `DELETE /api/blog/articles/:id` - Delete an article and its comments (author only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    routes::auth::MessageResponse,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use quill_shared::{
    audit::{self, CrudOperation, Resource},
    auth::{extract::AuthContext, ownership::require_author},
    db::is_unique_violation,
    models::{
        article::{Article, ArticleFilter, ArticleView, CreateArticle, UpdateArticle, SLUG_CONSTRAINT},
        category::Category,
    },
    slug::{unique_slug, SlugScope},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Attempts at picking a free slug when a concurrent insert takes ours
const SLUG_ATTEMPTS: usize = 3;

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ListArticlesQuery {
    /// Case-insensitive substring of title or content
    pub search: Option<String>,

    /// Only articles in this category
    pub category_id: Option<i64>,
}

/// Create article request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    /// Preferred slug; normalised and de-duplicated like a generated one
    #[validate(length(max = 200, message = "Slug must be at most 200 characters"))]
    pub slug: Option<String>,

    pub category_id: Option<i64>,

    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// Update article request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 200, message = "Slug must be at most 200 characters"))]
    pub slug: Option<String>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,

    pub category_id: Option<i64>,

    pub published: Option<bool>,
}

impl UpdateArticleRequest {
    /// Text the slug should be regenerated from, if any
    ///
    /// An explicit slug wins; otherwise a new title triggers regeneration.
    fn slug_source(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.title.as_deref())
    }
}

fn article_not_found() -> ApiError {
    ApiError::NotFound("Article not found".to_string())
}

async fn ensure_category(pool: &PgPool, category_id: Option<i64>) -> ApiResult<()> {
    if let Some(id) = category_id {
        if !Category::exists(pool, id).await? {
            return Err(ApiError::BadRequest(format!("Category {} does not exist", id)));
        }
    }
    Ok(())
}

async fn load_view(pool: &PgPool, id: i64) -> ApiResult<ArticleView> {
    Article::find_view(pool, id, false)
        .await?
        .ok_or_else(|| ApiError::InternalError(format!("Article {} vanished after write", id)))
}

/// List published articles, newest first
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> ApiResult<Json<Vec<ArticleView>>> {
    let filter = ArticleFilter {
        search: query.search,
        category_id: query.category_id,
    };

    let articles = Article::list_published(&state.db, &filter).await?;
    tracing::debug!(count = articles.len(), "Articles listed");

    Ok(Json(articles))
}

/// Get a published article
///
/// # Errors
///
/// - `404 Not Found`: Missing or unpublished
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ArticleView>> {
    let article = Article::find_view(&state.db, id, true)
        .await?
        .ok_or_else(article_not_found)?;

    Ok(Json(article))
}

/// Create an article authored by the caller
///
/// ```text
/// POST /api/blog/articles
/// { "title": "Hello", "content": "...", "category_id": 1 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown category
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_article(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateArticleRequest>,
) -> ApiResult<Json<ArticleView>> {
    ensure_category(&state.db, req.category_id).await?;

    let slug_source = req
        .slug
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(req.title.as_str());

    let mut attempt = 1;
    let article = loop {
        let slug = unique_slug(&state.db, SlugScope::Articles, slug_source, None).await?;

        let data = CreateArticle {
            title: req.title.clone(),
            slug,
            content: req.content.clone(),
            author_id: auth.user_id(),
            category_id: req.category_id,
            published: req.published,
        };

        match Article::create(&state.db, data).await {
            Ok(article) => break article,
            Err(e) if attempt < SLUG_ATTEMPTS && is_unique_violation(&e, Some(SLUG_CONSTRAINT)) => {
                tracing::debug!(attempt, "Article slug taken concurrently, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };

    audit::crud_operation(
        CrudOperation::Create,
        Resource::Article,
        &auth.user,
        article.id,
        json!({ "title": article.title }),
    );

    Ok(Json(load_view(&state.db, article.id).await?))
}

/// Update an article
///
/// A new title or slug regenerates the slug, excluding this article from
/// the collision check.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown category
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such article
pub async fn update_article(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<UpdateArticleRequest>,
) -> ApiResult<Json<ArticleView>> {
    let article = Article::find_by_id(&state.db, id)
        .await?
        .ok_or_else(article_not_found)?;

    if let Err(e) = require_author(article.author_id, auth.user_id()) {
        tracing::warn!(article_id = id, user_id = auth.user_id(), "Article update denied");
        return Err(e.into());
    }

    ensure_category(&state.db, req.category_id).await?;

    let slug = match req.slug_source() {
        Some(source) => Some(unique_slug(&state.db, SlugScope::Articles, source, Some(id)).await?),
        None => None,
    };

    let update = UpdateArticle {
        title: req.title,
        slug,
        content: req.content,
        category_id: req.category_id,
        published: req.published,
    };

    let updated = Article::update(&state.db, id, update)
        .await?
        .ok_or_else(article_not_found)?;

    audit::crud_operation(
        CrudOperation::Update,
        Resource::Article,
        &auth.user,
        updated.id,
        json!({ "title": updated.title }),
    );

    Ok(Json(load_view(&state.db, updated.id).await?))
}

/// Delete an article; its comments go with it
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such article
pub async fn delete_article(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let article = Article::find_by_id(&state.db, id)
        .await?
        .ok_or_else(article_not_found)?;

    if let Err(e) = require_author(article.author_id, auth.user_id()) {
        tracing::warn!(article_id = id, user_id = auth.user_id(), "Article delete denied");
        return Err(e.into());
    }

    if !Article::delete(&state.db, id).await? {
        return Err(article_not_found());
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Article,
        &auth.user,
        id,
        json!({ "title": article.title }),
    );

    Ok(MessageResponse::new("Article deleted successfully"))
}
