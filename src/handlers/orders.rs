use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::order::OrderStatus;
use crate::services::boundaries::Period;
use crate::services::orders::{NewOrderItem, OrderRecord, RevisedItem};
use crate::services::statistics::{OrderDetails, OrderSummary};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub client_name: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    /// Absent: the order lands on the restaurant's default table.
    pub table_id: Option<Uuid>,
    pub client_name: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CompleteOrderRequest {
    /// The revised item list. An empty list removes every line and restores
    /// all consumed stock.
    #[validate(nested)]
    pub items: Vec<ReviseOrderItem>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReviseOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    /// Reporting period token, defaults to ALL_TIME.
    pub period: Option<String>,
}

pub(crate) fn record_to_response(record: OrderRecord) -> OrderResponse {
    OrderResponse {
        id: record.order.id,
        table_id: record.order.table_id,
        client_name: record.order.client_name,
        status: record.order.status,
        total: record.order.total,
        items: record
            .items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect(),
        created_at: record.order.created_at,
        updated_at: record.order.updated_at,
    }
}

/// List orders within a period.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(("period" = Option<String>, Query, description = "Reporting period token")),
    responses((status = 200, description = "Orders in the window", body = [OrderSummary])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderSummary>> {
    let period = match query.period {
        Some(token) => Period::parse(&token)?,
        None => Period::AllTime,
    };
    let orders = state.services.statistics.orders(period).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Full order projection with its lines.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order details", body = OrderDetails),
        (status = 404, description = "Unknown order")
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetails> {
    let details = state.services.statistics.order_details(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Place an order on behalf of a customer (staff surface).
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Placed order", body = OrderResponse),
        (status = 400, description = "Empty order or invalid quantities"),
        (status = 422, description = "Insufficient stock")
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    request.validate()?;
    let ctx = state.services.restaurant.context().await?;

    let items = request
        .items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    let record = state
        .services
        .orders
        .launch(&ctx, request.table_id, request.client_name, items)
        .await?;

    Ok(Json(ApiResponse::success(record_to_response(record))))
}

/// Complete (validate) an order against a revised item list.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/complete",
    request_body = CompleteOrderRequest,
    responses(
        (status = 200, description = "Completed order", body = OrderResponse),
        (status = 400, description = "Order already terminal"),
        (status = 422, description = "Insufficient stock for the revision")
    ),
    tag = "orders"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteOrderRequest>,
) -> ApiResult<OrderResponse> {
    request.validate()?;

    let revised = request
        .items
        .into_iter()
        .map(|item| RevisedItem {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    let record = state.services.orders.complete(id, revised).await?;
    Ok(Json(ApiResponse::success(record_to_response(record))))
}

/// Cancel a live order, restoring its consumed stock.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    responses(
        (status = 200, description = "Canceled order", body = OrderResponse),
        (status = 400, description = "Order already terminal")
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let record = state.services.orders.cancel(id).await?;
    Ok(Json(ApiResponse::success(record_to_response(record))))
}

/// Mark a pending order as in preparation.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/start",
    responses(
        (status = 200, description = "Order now in progress"),
        (status = 400, description = "Order not pending")
    ),
    tag = "orders"
)]
pub async fn start_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let order = state.services.orders.start_preparation(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": order.id,
        "status": order.status,
    }))))
}

/// Current lifecycle status of an order.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/status",
    responses(
        (status = 200, description = "Order status"),
        (status = 404, description = "Unknown order")
    ),
    tag = "orders"
)]
pub async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let status = state.services.orders.get_status(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "status": status,
    }))))
}
