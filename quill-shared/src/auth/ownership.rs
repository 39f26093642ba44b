/// Ownership checks for authored content
///
/// Articles and comments may only be changed or deleted by their author.
///
/// # Example
///
/// ```
/// use quill_shared::auth::ownership::require_author;
///
/// assert!(require_author(7, 7).is_ok());
/// assert!(require_author(7, 8).is_err());
/// ```

/// Error type for ownership checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// Caller is not the author
    #[error("You can only modify your own content")]
    NotAuthor { author_id: i64, user_id: i64 },
}

/// Checks that `user_id` wrote the resource owned by `author_id`
pub fn require_author(author_id: i64, user_id: i64) -> Result<(), OwnershipError> {
    if author_id != user_id {
        tracing::debug!(author_id, user_id, "Ownership check failed");
        return Err(OwnershipError::NotAuthor { author_id, user_id });
    }

    Ok(())
}
