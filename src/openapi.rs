//! OpenAPI document and Swagger UI mount.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::restaurant::get_restaurant,
        crate::handlers::restaurant::onboard_restaurant,
        crate::handlers::restaurant::update_restaurant,
        crate::handlers::tables::list_tables,
        crate::handlers::tables::create_table,
        crate::handlers::tables::rename_table,
        crate::handlers::tables::delete_table,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::categories::category_products,
        crate::handlers::products::list_products,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::delete_product,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::complete_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::start_order,
        crate::handlers::orders::order_status,
        crate::handlers::statistics::summary,
        crate::handlers::statistics::breakdown,
        crate::handlers::statistics::insights,
        crate::handlers::menu::get_menu,
        crate::handlers::menu::place_client_order,
        crate::handlers::menu::client_order_status,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::order::OrderStatus,
        crate::handlers::restaurant::RestaurantResponse,
        crate::handlers::restaurant::GeofenceDto,
        crate::handlers::restaurant::OnboardRequest,
        crate::handlers::restaurant::UpdateSettingsRequest,
        crate::handlers::tables::TableResponse,
        crate::handlers::tables::CreateTableRequest,
        crate::handlers::tables::RenameTableRequest,
        crate::handlers::categories::CategoryResponse,
        crate::handlers::categories::CreateCategoryRequest,
        crate::handlers::categories::UpdateCategoryRequest,
        crate::handlers::products::ProductResponse,
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::products::AdjustStockRequest,
        crate::handlers::orders::OrderResponse,
        crate::handlers::orders::OrderItemResponse,
        crate::handlers::orders::CreateOrderRequest,
        crate::handlers::orders::CreateOrderItem,
        crate::handlers::orders::CompleteOrderRequest,
        crate::handlers::orders::ReviseOrderItem,
        crate::handlers::statistics::PeriodQuery,
        crate::handlers::menu::MenuResponse,
        crate::handlers::menu::MenuCategory,
        crate::handlers::menu::ClientOrderRequest,
        crate::handlers::menu::ClientOrderItem,
        crate::handlers::menu::ClientLocation,
        crate::services::statistics::SummaryStats,
        crate::services::statistics::CategoryBreakdown,
        crate::services::statistics::BreakdownEntry,
        crate::services::statistics::OrderSummary,
        crate::services::statistics::OrderDetails,
        crate::services::statistics::OrderItemDetails,
    )),
    tags(
        (name = "restaurant", description = "Deployment onboarding and settings"),
        (name = "tables", description = "Dining table management"),
        (name = "categories", description = "Menu categories"),
        (name = "products", description = "Catalog and stock"),
        (name = "orders", description = "Order lifecycle"),
        (name = "statistics", description = "Sales statistics"),
        (name = "menu", description = "Customer-facing menu and ordering"),
    ),
    info(
        title = "ardoise-api",
        description = "Restaurant order management backend"
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
