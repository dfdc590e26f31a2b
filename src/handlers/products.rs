use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::product;
use crate::services::products::{CreateProduct, UpdateProduct};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub images: Vec<String>,
    pub category_id: Uuid,
    /// Lifetime units sold, derived from the order history.
    pub sold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0, message = "Initial stock must not be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AdjustStockRequest {
    /// Signed adjustment: positive restocks, negative corrects downwards.
    pub delta: i32,
}

pub(crate) fn product_to_response(model: product::Model, sold: i64) -> ProductResponse {
    let images = model
        .images
        .as_ref()
        .and_then(|value| serde_json::from_value::<Vec<String>>(value.clone()).ok())
        .unwrap_or_default();

    ProductResponse {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        low_stock_threshold: model.low_stock_threshold,
        images,
        category_id: model.category_id,
        sold,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// List products with sales counts.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Products", body = [ProductResponse])),
    tag = "products"
)]
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Vec<ProductResponse>> {
    let ctx = state.services.restaurant.context().await?;
    let summaries = state.services.products.list_with_sales(&ctx).await?;
    Ok(Json(ApiResponse::success(
        summaries
            .into_iter()
            .map(|s| product_to_response(s.product, s.sold))
            .collect(),
    )))
}

/// Products at or below their low-stock threshold.
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses((status = 200, description = "Low-stock products", body = [ProductResponse])),
    tag = "products"
)]
pub async fn low_stock_products(State(state): State<AppState>) -> ApiResult<Vec<ProductResponse>> {
    let products = state.services.inventory.low_stock().await?;
    Ok(Json(ApiResponse::success(
        products
            .into_iter()
            .map(|p| product_to_response(p, 0))
            .collect(),
    )))
}

/// Create a product.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses((status = 200, description = "Created product", body = ProductResponse)),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<ProductResponse> {
    request.validate()?;
    let ctx = state.services.restaurant.context().await?;

    // Reject unknown categories up front.
    state.services.categories.get(request.category_id).await?;

    let model = state
        .services
        .products
        .create(
            &ctx,
            CreateProduct {
                name: request.name,
                description: request.description,
                price: request.price,
                stock: request.stock,
                low_stock_threshold: request.low_stock_threshold,
                images: request.images,
                category_id: request.category_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(product_to_response(model, 0))))
}

/// Update product metadata and price.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    responses((status = 200, description = "Updated product", body = ProductResponse)),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<ProductResponse> {
    request.validate()?;

    if let Some(category_id) = request.category_id {
        state.services.categories.get(category_id).await?;
    }

    let model = state
        .services
        .products
        .update(
            id,
            UpdateProduct {
                name: request.name,
                description: request.description.map(Some),
                price: request.price,
                low_stock_threshold: request.low_stock_threshold,
                images: request.images,
                category_id: request.category_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(product_to_response(model, 0))))
}

/// Adjust a product's stock through the ledger.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Adjusted product", body = ProductResponse),
        (status = 422, description = "Adjustment would drive stock negative")
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<ProductResponse> {
    let model = state.services.inventory.adjust_stock(id, request.delta).await?;
    Ok(Json(ApiResponse::success(product_to_response(model, 0))))
}

/// Delete a product.
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    responses((status = 200, description = "Product deleted")),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.products.delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}
