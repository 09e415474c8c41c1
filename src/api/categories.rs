//! Category API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{created, done, error, rejected, respond, success, success_with_message, ApiResult};
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use crate::validation::{parse_id, sanitize_line, sanitize_text, validate_category};
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    respond(state.repo.list_categories().await, &state)
}

/// GET /api/categories/:id - Get a single category.
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    if let Err(e) = parse_id("category", &id) {
        return error(e, &state);
    }

    match state.repo.get_category(&id).await {
        Ok(Some(category)) => success(category),
        Ok(None) => error(
            AppError::NotFound(format!("Category {} not found", id)),
            &state,
        ),
        Err(e) => error(e, &state),
    }
}

/// GET /api/categories/slug/:slug - Get a category by slug.
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Category> {
    match state.repo.get_category_by_slug(&slug).await {
        Ok(Some(category)) => success(category),
        Ok(None) => error(
            AppError::NotFound(format!("Category with slug '{}' not found", slug)),
            &state,
        ),
        Err(e) => error(e, &state),
    }
}

/// POST /api/categories - Create a new category.
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> ApiResult<Category> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    let name = sanitize_line(&request.name);
    let description = request
        .description
        .as_deref()
        .map(sanitize_text)
        .filter(|d| !d.is_empty());

    if let Err(e) = validate_category(Some(name.as_str()), description.as_deref()) {
        return error(e, &state);
    }

    match state
        .repo
        .create_category(&name, description.as_deref())
        .await
    {
        Ok(category) => {
            tracing::info!("Created category '{}' ({})", category.name, category.id);
            created(category, "Category created successfully")
        }
        Err(e) => error(e, &state),
    }
}

/// PUT /api/categories/:id - Rename or re-describe a category.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> ApiResult<Category> {
    if let Err(e) = parse_id("category", &id) {
        return error(e, &state);
    }
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    let name = request.name.as_deref().map(sanitize_line);
    let description = request.description.as_deref().map(sanitize_text);

    if name.is_none() && description.is_none() {
        return error(
            AppError::Validation("No changes provided".to_string()),
            &state,
        );
    }
    if let Err(e) = validate_category(name.as_deref(), description.as_deref()) {
        return error(e, &state);
    }

    match state
        .repo
        .update_category(&id, name.as_deref(), description.as_deref())
        .await
    {
        Ok(category) => success_with_message(category, "Category updated successfully"),
        Err(e) => error(e, &state),
    }
}

/// DELETE /api/categories/:id - Delete a category.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if let Err(e) = parse_id("category", &id) {
        return error(e, &state);
    }

    match state.repo.delete_category(&id).await {
        Ok(()) => {
            tracing::info!("Deleted category {}", id);
            done("Category deleted successfully")
        }
        Err(e) => error(e, &state),
    }
}
