/// Article model and database operations
///
/// Two shapes are exposed: [`Article`] mirrors the table row and is used for
/// ownership checks and updates; [`ArticleView`] joins the author's username
/// and the category name and is what the API returns.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE articles (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     slug VARCHAR(200) NOT NULL UNIQUE,
///     content TEXT NOT NULL,
///     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
///     published BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Comments reference articles with `ON DELETE CASCADE`, so deleting an
/// article removes its comments in the same statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Name of the unique constraint on `articles.slug`
pub const SLUG_CONSTRAINT: &str = "articles_slug_key";

/// Article table row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article joined with author and category names
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published: bool,
}

/// Input for creating an article; the slug must already be unique
#[derive(Debug, Clone)]
pub struct CreateArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub published: bool,
}

/// Fields to update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
    pub published: Option<bool>,
}

impl UpdateArticle {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.content.is_none()
            && self.category_id.is_none()
            && self.published.is_none()
    }
}

/// Filters for the public article listing
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring match on title or content
    pub search: Option<String>,

    /// Restrict to one category
    pub category_id: Option<i64>,
}

const ARTICLE_COLUMNS: &str =
    "id, title, slug, content, author_id, category_id, published, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT a.id, a.title, a.slug, a.content, a.author_id, u.username AS author_username,
           a.category_id, c.name AS category_name, a.created_at, a.updated_at, a.published
    FROM articles a
    JOIN users u ON u.id = a.author_id
    LEFT JOIN categories c ON c.id = a.category_id
"#;

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Article {
    /// Creates an article
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`SLUG_CONSTRAINT`] if the slug is taken.
    pub async fn create(pool: &PgPool, data: CreateArticle) -> Result<Self, sqlx::Error> {
        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            INSERT INTO articles (title, slug, content, author_id, category_id, published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.slug)
        .bind(data.content)
        .bind(data.author_id)
        .bind(data.category_id)
        .bind(data.published)
        .fetch_one(pool)
        .await?;

        Ok(article)
    }

    /// Finds an article row by ID, published or not
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(article)
    }

    /// Loads the joined view of an article
    ///
    /// With `published_only`, unpublished articles are reported as missing.
    pub async fn find_view(
        pool: &PgPool,
        id: i64,
        published_only: bool,
    ) -> Result<Option<ArticleView>, sqlx::Error> {
        let view = sqlx::query_as::<_, ArticleView>(&format!(
            "{VIEW_SELECT} WHERE a.id = $1 AND ($2 = FALSE OR a.published = TRUE)"
        ))
        .bind(id)
        .bind(published_only)
        .fetch_optional(pool)
        .await?;

        Ok(view)
    }

    /// Lists published articles, newest first
    pub async fn list_published(
        pool: &PgPool,
        filter: &ArticleFilter,
    ) -> Result<Vec<ArticleView>, sqlx::Error> {
        let pattern = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let articles = sqlx::query_as::<_, ArticleView>(&format!(
            r#"
            {VIEW_SELECT}
            WHERE a.published = TRUE
              AND ($1::TEXT IS NULL OR a.title ILIKE $1 OR a.content ILIKE $1)
              AND ($2::BIGINT IS NULL OR a.category_id = $2)
            ORDER BY a.created_at DESC, a.id DESC
            "#
        ))
        .bind(pattern)
        .bind(filter.category_id)
        .fetch_all(pool)
        .await?;

        Ok(articles)
    }

    /// Lists every article (admin), newest first
    pub async fn list_all(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ArticleView>, sqlx::Error> {
        let articles = sqlx::query_as::<_, ArticleView>(&format!(
            "{VIEW_SELECT} ORDER BY a.created_at DESC, a.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(articles)
    }

    /// Updates the given fields and bumps `updated_at`
    ///
    /// An empty update leaves the row untouched. Returns None if the article
    /// doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateArticle,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query = String::from("UPDATE articles SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.slug.is_some() {
            bind_count += 1;
            query.push_str(&format!(", slug = ${}", bind_count));
        }
        if data.content.is_some() {
            bind_count += 1;
            query.push_str(&format!(", content = ${}", bind_count));
        }
        if data.category_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", category_id = ${}", bind_count));
        }
        if data.published.is_some() {
            bind_count += 1;
            query.push_str(&format!(", published = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Article>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(slug) = data.slug {
            q = q.bind(slug);
        }
        if let Some(content) = data.content {
            q = q.bind(content);
        }
        if let Some(category_id) = data.category_id {
            q = q.bind(category_id);
        }
        if let Some(published) = data.published {
            q = q.bind(published);
        }

        let article = q.fetch_optional(pool).await?;

        Ok(article)
    }

    /// Deletes an article and, through the foreign key, its comments
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all articles
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
