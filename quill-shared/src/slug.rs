//! URL slug generation
//!
//! Slugs are derived from a title or name: transliterated to ASCII,
//! lower-cased, punctuation stripped and words joined with `-`. When the
//! slug is already taken in the target table a numeric suffix is appended,
//! picking the first free one of `foo`, `foo-1`, `foo-2`, ...
//!
//! The database UNIQUE constraint on the slug column stays the authority;
//! two concurrent writers can still pick the same candidate and one of them
//! will get a unique violation.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::models::article::escape_like;

/// Room kept at the end of a truncated base slug for a `-N` suffix
const SUFFIX_RESERVE: usize = 8;

/// Table a slug must be unique in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Articles,
    Categories,
}

impl SlugScope {
    fn table(self) -> &'static str {
        match self {
            SlugScope::Articles => "articles",
            SlugScope::Categories => "categories",
        }
    }

    /// Column width of the slug
    pub fn max_len(self) -> usize {
        match self {
            SlugScope::Articles => 200,
            SlugScope::Categories => 100,
        }
    }

    /// Used when the source text has nothing slug-worthy in it
    fn fallback(self) -> &'static str {
        match self {
            SlugScope::Articles => "article",
            SlugScope::Categories => "category",
        }
    }
}

/// Normalises `text` into a base slug for `scope`
pub fn base_slug(text: &str, scope: SlugScope) -> String {
    let mut slug = slug::slugify(text);

    let limit = scope.max_len() - SUFFIX_RESERVE;
    if slug.len() > limit {
        slug.truncate(limit);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        scope.fallback().to_string()
    } else {
        slug
    }
}

/// Picks the first candidate of `base`, `base-1`, `base-2`, ... not in `taken`
pub fn next_free_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    (1u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Generates a slug from `text` that is free in `scope`
///
/// `exclude_id` is the row being updated, whose own slug doesn't count as taken.
pub async fn unique_slug(
    pool: &PgPool,
    scope: SlugScope,
    text: &str,
    exclude_id: Option<i64>,
) -> Result<String, sqlx::Error> {
    let base = base_slug(text, scope);

    let taken: Vec<String> = sqlx::query_scalar(&format!(
        r#"
        SELECT slug FROM {}
        WHERE (slug = $1 OR slug LIKE $2)
          AND ($3::BIGINT IS NULL OR id <> $3)
        "#,
        scope.table()
    ))
    .bind(&base)
    .bind(format!("{}-%", escape_like(&base)))
    .bind(exclude_id)
    .fetch_all(pool)
    .await?;

    let taken: HashSet<String> = taken.into_iter().collect();
    let slug = next_free_slug(&base, &taken);

    tracing::debug!(scope = scope.table(), base = %base, slug = %slug, "Generated slug");
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(slugs: &[&str]) -> HashSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_slug_normalises() {
        assert_eq!(base_slug("Hello, World!", SlugScope::Articles), "hello-world");
        assert_eq!(base_slug("  Rust & Tokio  ", SlugScope::Articles), "rust-tokio");
        assert_eq!(base_slug("Already-a-slug", SlugScope::Categories), "already-a-slug");
    }

    #[test]
    fn test_base_slug_transliterates() {
        let slug = base_slug("Тестовая статья", SlugScope::Articles);
        assert!(!slug.is_empty());
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_base_slug_fallback() {
        assert_eq!(base_slug("!!!", SlugScope::Articles), "article");
        assert_eq!(base_slug("", SlugScope::Categories), "category");
    }

    #[test]
    fn test_base_slug_truncates_for_suffix() {
        let long = "word ".repeat(100);
        let slug = base_slug(&long, SlugScope::Categories);

        assert!(slug.len() <= SlugScope::Categories.max_len() - SUFFIX_RESERVE);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_next_free_slug_unused_base() {
        assert_eq!(next_free_slug("foo", &taken(&[])), "foo");
        assert_eq!(next_free_slug("foo", &taken(&["foo-1", "bar"])), "foo");
    }

    #[test]
    fn test_next_free_slug_sequence() {
        assert_eq!(next_free_slug("foo", &taken(&["foo"])), "foo-1");
        assert_eq!(next_free_slug("foo", &taken(&["foo", "foo-1"])), "foo-2");
        assert_eq!(next_free_slug("foo", &taken(&["foo", "foo-1", "foo-2"])), "foo-3");
    }

    #[test]
    fn test_next_free_slug_fills_gaps() {
        assert_eq!(next_free_slug("foo", &taken(&["foo", "foo-2"])), "foo-1");
    }

    #[test]
    fn test_next_free_slug_ignores_similar_prefixes() {
        assert_eq!(next_free_slug("foo", &taken(&["foo", "foo-bar", "foo-1x"])), "foo-1");
    }
}
