/// Comment endpoints
///
/// - `GET    /api/blog/articles/:id/comments` - List an article's comments
/// - `POST   /api/blog/comments` - Comment on an article
/// - `PUT    /api/blog/comments/:id` - Edit a comment (author only)
/// - `DELETE /api/blog/comments/:id` - Delete a comment (author only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    routes::auth::MessageResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use quill_shared::{
    audit::{self, CrudOperation, Resource},
    auth::{extract::AuthContext, ownership::require_author},
    models::{
        article::Article,
        comment::{Comment, CommentView, CreateComment},
    },
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub article_id: i64,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment not found".to_string())
}

/// List comments on an article, newest first
///
/// # Errors
///
/// - `404 Not Found`: No such article
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> ApiResult<Json<Vec<CommentView>>> {
    if Article::find_by_id(&state.db, article_id).await?.is_none() {
        return Err(ApiError::NotFound("Article not found".to_string()));
    }

    let comments = Comment::list_by_article(&state.db, article_id).await?;
    tracing::debug!(article_id, count = comments.len(), "Comments listed");

    Ok(Json(comments))
}

/// Comment on an article
///
/// # Errors
///
/// - `404 Not Found`: No such article
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateCommentRequest>,
) -> ApiResult<Json<CommentView>> {
    if Article::find_by_id(&state.db, req.article_id).await?.is_none() {
        return Err(ApiError::NotFound("Article not found".to_string()));
    }

    let comment = Comment::create(
        &state.db,
        CreateComment {
            article_id: req.article_id,
            author_id: auth.user_id(),
            content: req.content,
        },
    )
    .await?;

    audit::crud_operation(
        CrudOperation::Create,
        Resource::Comment,
        &auth.user,
        comment.id,
        json!({ "article_id": comment.article_id }),
    );

    let view = Comment::find_view(&state.db, comment.id)
        .await?
        .ok_or_else(comment_not_found)?;

    Ok(Json(view))
}

/// Replace a comment's content
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such comment
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidJson(req): ValidJson<UpdateCommentRequest>,
) -> ApiResult<Json<CommentView>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(comment_not_found)?;

    if let Err(e) = require_author(comment.author_id, auth.user_id()) {
        tracing::warn!(comment_id = id, user_id = auth.user_id(), "Comment update denied");
        return Err(e.into());
    }

    Comment::update_content(&state.db, id, &req.content)
        .await?
        .ok_or_else(comment_not_found)?;

    audit::crud_operation(
        CrudOperation::Update,
        Resource::Comment,
        &auth.user,
        id,
        json!({ "article_id": comment.article_id }),
    );

    let view = Comment::find_view(&state.db, id)
        .await?
        .ok_or_else(comment_not_found)?;

    Ok(Json(view))
}

/// Delete a comment
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author
/// - `404 Not Found`: No such comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(comment_not_found)?;

    if let Err(e) = require_author(comment.author_id, auth.user_id()) {
        tracing::warn!(comment_id = id, user_id = auth.user_id(), "Comment delete denied");
        return Err(e.into());
    }

    if !Comment::delete(&state.db, id).await? {
        return Err(comment_not_found());
    }

    audit::crud_operation(
        CrudOperation::Delete,
        Resource::Comment,
        &auth.user,
        id,
        json!({ "article_id": comment.article_id }),
    );

    Ok(MessageResponse::new("Comment deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_comment_request() {
        let req: CreateCommentRequest =
            serde_json::from_str(r#"{"article_id": 3, "content": "Nice", "token": "t"}"#).unwrap();
        assert_eq!(req.article_id, 3);
        assert!(req.validate().is_ok());

        let empty: CreateCommentRequest =
            serde_json::from_str(r#"{"article_id": 3, "content": ""}"#).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_create_comment_request_needs_article() {
        assert!(serde_json::from_str::<CreateCommentRequest>(r#"{"content": "x"}"#).is_err());
    }
}
