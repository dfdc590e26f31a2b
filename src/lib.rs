//! ardoise-api
//!
//! Backend for a single-restaurant ordering system: staff manage tables,
//! categories and products; customers order from a per-table QR menu; the
//! order lifecycle keeps product stock consistent under concurrency.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod order_tracking;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface.
pub fn api_v1_routes() -> Router<AppState> {
    let restaurant = Router::new()
        .route("/restaurant", get(handlers::restaurant::get_restaurant))
        .route("/restaurant", post(handlers::restaurant::onboard_restaurant))
        .route("/restaurant", put(handlers::restaurant::update_restaurant));

    let tables = Router::new()
        .route("/tables", get(handlers::tables::list_tables))
        .route("/tables", post(handlers::tables::create_table))
        .route("/tables/{id}", put(handlers::tables::rename_table))
        .route("/tables/{id}", delete(handlers::tables::delete_table));

    let categories = Router::new()
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories", post(handlers::categories::create_category))
        .route("/categories/{id}", put(handlers::categories::update_category))
        .route(
            "/categories/{id}",
            delete(handlers::categories::delete_category),
        )
        .route(
            "/categories/{id}/products",
            get(handlers::categories::category_products),
        );

    let products = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products", post(handlers::products::create_product))
        .route(
            "/products/low-stock",
            get(handlers::products::low_stock_products),
        )
        .route("/products/{id}", put(handlers::products::update_product))
        .route("/products/{id}", delete(handlers::products::delete_product))
        .route("/products/{id}/stock", post(handlers::products::adjust_stock));

    let orders = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route("/orders/{id}/complete", post(handlers::orders::complete_order))
        .route("/orders/{id}/cancel", post(handlers::orders::cancel_order))
        .route("/orders/{id}/start", post(handlers::orders::start_order))
        .route("/orders/{id}/status", get(handlers::orders::order_status));

    let statistics = Router::new()
        .route("/statistics/summary", get(handlers::statistics::summary))
        .route("/statistics/breakdown", get(handlers::statistics::breakdown))
        .route("/statistics/insights", get(handlers::statistics::insights));

    let menu = Router::new()
        .route("/menu", get(handlers::menu::get_menu))
        .route("/menu/orders", post(handlers::menu::place_client_order))
        .route(
            "/menu/orders/{id}/status",
            get(handlers::menu::client_order_status),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(restaurant)
        .merge(tables)
        .merge(categories)
        .merge(products)
        .merge(orders)
        .merge(statistics)
        .merge(menu)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "ardoise-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }
}
