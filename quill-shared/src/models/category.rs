/// Category model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL UNIQUE,
///     slug VARCHAR(100) NOT NULL UNIQUE,
///     description TEXT NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::db::is_unique_violation;
use crate::slug::{unique_slug, SlugScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Name of the unique constraint on `categories.name`
pub const NAME_CONSTRAINT: &str = "categories_name_key";

/// Name of the unique constraint on `categories.slug`
pub const SLUG_CONSTRAINT: &str = "categories_slug_key";

/// Slug generations tried before a concurrent slug collision is returned
pub const SLUG_ATTEMPTS: usize = 3;

/// Article category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category; the slug must already be unique
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at";

impl Category {
    /// Creates a category
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`NAME_CONSTRAINT`] or [`SLUG_CONSTRAINT`].
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.slug)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    /// Creates a category under the first free slug derived from `slug_source`
    ///
    /// A slug taken by a concurrent insert is regenerated, up to
    /// [`SLUG_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`NAME_CONSTRAINT`] if the name is taken.
    pub async fn create_with_slug(
        pool: &PgPool,
        name: &str,
        slug_source: &str,
        description: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut attempt = 1;
        loop {
            let slug = unique_slug(pool, SlugScope::Categories, slug_source, None).await?;
            let data = CreateCategory {
                name: name.to_string(),
                slug,
                description: description.to_string(),
            };

            match Self::create(pool, data).await {
                Err(e) if attempt < SLUG_ATTEMPTS && is_unique_violation(&e, Some(SLUG_CONSTRAINT)) => {
                    tracing::debug!(attempt, "Category slug taken concurrently, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Finds a category by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Checks whether a category exists
    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Lists all categories ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
        ))
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    /// Deletes a category; its articles keep existing without a category
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all categories
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
