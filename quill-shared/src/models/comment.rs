/// Comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id BIGSERIAL PRIMARY KEY,
///     article_id BIGINT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
///     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Comment table row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment joined with its article title and author username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub article_id: i64,
    pub article_title: String,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub article_id: i64,
    pub author_id: i64,
    pub content: String,
}

const COMMENT_COLUMNS: &str = "id, article_id, author_id, content, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT c.id, c.article_id, a.title AS article_title, c.author_id,
           u.username AS author_username, c.content, c.created_at, c.updated_at
    FROM comments c
    JOIN articles a ON a.id = c.article_id
    JOIN users u ON u.id = c.author_id
"#;

impl Comment {
    /// Creates a comment
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (article_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(data.article_id)
        .bind(data.author_id)
        .bind(data.content)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Finds a comment row by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Loads the joined view of a comment
    pub async fn find_view(pool: &PgPool, id: i64) -> Result<Option<CommentView>, sqlx::Error> {
        let view = sqlx::query_as::<_, CommentView>(&format!("{VIEW_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(view)
    }

    /// Lists an article's comments, newest first
    pub async fn list_by_article(
        pool: &PgPool,
        article_id: i64,
    ) -> Result<Vec<CommentView>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentView>(&format!(
            "{VIEW_SELECT} WHERE c.article_id = $1 ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(article_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Lists every comment (admin), newest first
    pub async fn list_all(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentView>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentView>(&format!(
            "{VIEW_SELECT} ORDER BY c.created_at DESC, c.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Replaces the content and bumps `updated_at`
    pub async fn update_content(
        pool: &PgPool,
        id: i64,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Deletes a comment
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all comments
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
