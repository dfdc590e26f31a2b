//! Customer-facing surface: the menu behind the per-table QR code, order
//! placement gated by the restaurant's geofence, and status polling for the
//! device-local order cache.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::orders::{record_to_response, OrderResponse};
use crate::handlers::products::{product_to_response, ProductResponse};
use crate::services::orders::NewOrderItem;
use crate::services::restaurant::Coordinates;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuResponse {
    pub restaurant_name: String,
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientOrderRequest {
    /// The table scanned from the QR code; absent for walk-up orders.
    pub table_id: Option<Uuid>,
    pub client_name: Option<String>,
    /// Device geolocation, checked against the restaurant's geofence.
    pub location: Option<ClientLocation>,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<ClientOrderItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

/// The menu: every category with its products.
#[utoipa::path(
    get,
    path = "/api/v1/menu",
    responses((status = 200, description = "The menu", body = MenuResponse)),
    tag = "menu"
)]
pub async fn get_menu(State(state): State<AppState>) -> ApiResult<MenuResponse> {
    let restaurant = state.services.restaurant.get().await?;
    let ctx = state.services.restaurant.context().await?;

    let categories = state.services.categories.list(&ctx).await?;
    let mut menu_categories = Vec::with_capacity(categories.len());
    for summary in categories {
        let products = state
            .services
            .products
            .list_by_category(summary.category.id)
            .await?;
        menu_categories.push(MenuCategory {
            id: summary.category.id,
            name: summary.category.name,
            description: summary.category.description,
            products: products
                .into_iter()
                .map(|p| product_to_response(p, 0))
                .collect(),
        });
    }

    Ok(Json(ApiResponse::success(MenuResponse {
        restaurant_name: restaurant.name,
        categories: menu_categories,
    })))
}

/// Place a customer order.
///
/// Unit prices are resolved server-side from the live catalog; the client
/// never supplies them. With a configured geofence the submitted
/// coordinates must fall inside it.
#[utoipa::path(
    post,
    path = "/api/v1/menu/orders",
    request_body = ClientOrderRequest,
    responses(
        (status = 200, description = "Placed order", body = OrderResponse),
        (status = 403, description = "Outside the service area"),
        (status = 422, description = "Insufficient stock")
    ),
    tag = "menu"
)]
pub async fn place_client_order(
    State(state): State<AppState>,
    Json(request): Json<ClientOrderRequest>,
) -> ApiResult<OrderResponse> {
    request.validate()?;
    let ctx = state.services.restaurant.context().await?;

    let point = request.location.map(|l| Coordinates {
        latitude: l.latitude,
        longitude: l.longitude,
    });
    ctx.ensure_on_premises(point)?;

    let mut items = Vec::with_capacity(request.items.len());
    for item in request.items {
        let product = state.services.products.get(item.product_id).await?;
        items.push(NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: product.price,
        });
    }

    let record = state
        .services
        .orders
        .launch(&ctx, request.table_id, request.client_name, items)
        .await?;

    Ok(Json(ApiResponse::success(record_to_response(record))))
}

/// Status poll for the device-local order cache.
#[utoipa::path(
    get,
    path = "/api/v1/menu/orders/{id}/status",
    responses(
        (status = 200, description = "Order status"),
        (status = 404, description = "Unknown order")
    ),
    tag = "menu"
)]
pub async fn client_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let status = state.services.orders.get_status(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "status": status,
    }))))
}
