use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::products::{product_to_response, ProductResponse};
use crate::services::categories::CategorySummary;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
}

fn to_response(summary: CategorySummary) -> CategoryResponse {
    CategoryResponse {
        id: summary.category.id,
        name: summary.category.name,
        description: summary.category.description,
        product_count: summary.product_count,
        created_at: summary.category.created_at,
        updated_at: summary.category.updated_at,
    }
}

/// List categories with product counts.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories", body = [CategoryResponse])),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryResponse>> {
    let ctx = state.services.restaurant.context().await?;
    let summaries = state.services.categories.list(&ctx).await?;
    Ok(Json(ApiResponse::success(
        summaries.into_iter().map(to_response).collect(),
    )))
}

/// Create a category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses((status = 200, description = "Created category", body = CategoryResponse)),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<CategoryResponse> {
    request.validate()?;
    let ctx = state.services.restaurant.context().await?;
    let category = state
        .services
        .categories
        .create(&ctx, request.name, request.description)
        .await?;
    Ok(Json(ApiResponse::success(to_response(CategorySummary {
        category,
        product_count: 0,
    }))))
}

/// Update a category.
#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    request_body = UpdateCategoryRequest,
    responses((status = 200, description = "Updated category", body = CategoryResponse)),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<CategoryResponse> {
    request.validate()?;
    let category = state
        .services
        .categories
        .update(id, request.name, request.description)
        .await?;

    let product_count = state.services.products.list_by_category(id).await?.len() as u64;
    Ok(Json(ApiResponse::success(to_response(CategorySummary {
        category,
        product_count,
    }))))
}

/// Delete a category and every product it owns.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    responses((status = 200, description = "Category and its products deleted")),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let removed = state.services.categories.delete_category_cascade(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "products_removed": removed
    }))))
}

/// List the products of one category.
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/products",
    responses((status = 200, description = "Products of the category", body = [ProductResponse])),
    tag = "categories"
)]
pub async fn category_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ProductResponse>> {
    // Surface NotFound for a bogus category before listing.
    state.services.categories.get(id).await?;
    let products = state.services.products.list_by_category(id).await?;
    Ok(Json(ApiResponse::success(
        products
            .into_iter()
            .map(|p| product_to_response(p, 0))
            .collect(),
    )))
}
