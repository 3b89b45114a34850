//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::category::{Category, CategoryName},
};

use super::ApiKey;

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.categories.list().await?;
    Ok(Json(categories))
}

/// Get category by ID
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_category(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let category = state.services.categories.get_by_id(id).await?;
    Ok(Json(category))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("api_key" = [])),
    request_body = CategoryName,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    _key: ApiKey,
    Json(request): Json<CategoryName>,
) -> AppResult<(StatusCode, Json<Category>)> {
    request.validate()?;
    let category = state.services.categories.create(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename a category
#[utoipa::path(
    patch,
    path = "/categories/{id}",
    tag = "categories",
    security(("api_key" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryName,
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Name already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    _key: ApiKey,
    Path(id): Path<i32>,
    Json(request): Json<CategoryName>,
) -> AppResult<Json<Category>> {
    request.validate()?;
    let category = state.services.categories.rename(id, &request.name).await?;
    Ok(Json(category))
}

/// Delete a category (its books are kept, uncategorised)
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("api_key" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    _key: ApiKey,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
