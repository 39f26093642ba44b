/// Category endpoints
///
/// - `GET  /api/blog/categories` - List categories by name
/// - `GET  /api/blog/categories/:id` - Get one category
/// - `POST /api/blog/categories` - Create a category (any authenticated user)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use quill_shared::{
    audit::{self, CrudOperation, Resource},
    auth::extract::AuthContext,
    models::category::Category,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Create category request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Slug must be at most 100 characters"))]
    pub slug: Option<String>,

    pub description: Option<String>,
}

/// List all categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(Category::list(&state.db).await?))
}

/// Get a category
///
/// # Errors
///
/// - `404 Not Found`: No such category
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Create a category
///
/// # Errors
///
/// - `400 Bad Request`: Name already taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let slug_source = req
        .slug
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(req.name.as_str());

    let category = Category::create_with_slug(
        &state.db,
        &req.name,
        slug_source,
        req.description.as_deref().unwrap_or_default(),
    )
    .await?;

    audit::crud_operation(
        CrudOperation::Create,
        Resource::Category,
        &auth.user,
        category.id,
        json!({ "name": category.name }),
    );

    Ok(Json(category))
}
