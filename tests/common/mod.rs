//! Shared harness for integration tests: an onboarded restaurant over an
//! in-memory SQLite database with the embedded migrations applied.
//!
//! The pool is capped at a single connection so every test sees one
//! private database.

use std::sync::Arc;
use std::time::Duration;

use ardoise_api::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{category, product},
    events::{self, EventSender},
    handlers::AppServices,
    services::restaurant::{OnboardRestaurant, RestaurantContext},
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub ctx: RestaurantContext,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a fresh application with its own database and an
    /// onboarded restaurant.
    pub async fn new() -> Self {
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            ..Default::default()
        };

        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 0, "test");
        let services = AppServices::new(db_arc.clone(), event_sender, &cfg);

        services
            .restaurant
            .onboard(OnboardRestaurant {
                name: "Test Bistro".to_string(),
                address: None,
                phone: None,
                email: None,
                website: None,
                logo_url: None,
            })
            .await
            .expect("failed to onboard test restaurant");

        let ctx = services
            .restaurant
            .context()
            .await
            .expect("restaurant context should resolve after onboarding");

        Self {
            db: db_arc,
            services,
            ctx,
            _event_task: event_task,
        }
    }

    pub async fn seed_category(&self, name: &str) -> category::Model {
        self.services
            .categories
            .create(&self.ctx, name.to_string(), None)
            .await
            .expect("seed category")
    }

    pub async fn seed_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> product::Model {
        self.services
            .products
            .create(
                &self.ctx,
                ardoise_api::services::products::CreateProduct {
                    name: name.to_string(),
                    description: None,
                    price,
                    stock,
                    low_stock_threshold: 0,
                    images: Vec::new(),
                    category_id,
                },
            )
            .await
            .expect("seed product")
    }

    /// Re-reads a product row, asserting it exists.
    pub async fn product(&self, product_id: Uuid) -> product::Model {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .expect("product query")
            .expect("product should exist")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
