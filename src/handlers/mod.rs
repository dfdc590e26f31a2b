pub mod categories;
pub mod menu;
pub mod orders;
pub mod products;
pub mod restaurant;
pub mod statistics;
pub mod tables;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub restaurant: Arc<crate::services::restaurant::RestaurantService>,
    pub tables: Arc<crate::services::tables::TableService>,
    pub categories: Arc<crate::services::categories::CategoryService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub statistics: Arc<crate::services::statistics::StatisticsService>,
    pub insights: Arc<crate::services::insights::InsightsService>,
}

impl AppServices {
    /// Wires up the service graph over one connection pool.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, cfg: &AppConfig) -> Self {
        let restaurant = Arc::new(crate::services::restaurant::RestaurantService::new(
            db_pool.clone(),
            event_sender.clone(),
            cfg.default_table_name.clone(),
        ));
        let tables = crate::services::tables::TableService::new(
            db_pool.clone(),
            cfg.default_table_name.clone(),
        );
        let categories = Arc::new(crate::services::categories::CategoryService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
        ));
        let inventory = crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
        );
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            event_sender,
            inventory.clone(),
            tables.clone(),
        ));
        let statistics = Arc::new(crate::services::statistics::StatisticsService::new(
            db_pool.clone(),
        ));
        let insights = Arc::new(crate::services::insights::InsightsService::new(
            cfg.analysis_endpoint.clone(),
        ));

        Self {
            restaurant,
            tables: Arc::new(tables),
            categories,
            products,
            inventory: Arc::new(inventory),
            orders,
            statistics,
            insights,
        }
    }
}
