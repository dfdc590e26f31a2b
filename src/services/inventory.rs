use crate::{
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One line of a stock availability check.
#[derive(Debug, Clone, Copy)]
pub struct StockRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A signed stock adjustment. Negative consumes, positive restores.
#[derive(Debug, Clone, Copy)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub delta: i32,
}

/// Owns the product stock counters and the `stock >= 0` invariant.
///
/// Stock is written exclusively through [`InventoryService::apply_delta`];
/// the conditional update it issues is the authoritative guard, regardless
/// of what any earlier advisory check concluded.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Advisory stock check: verifies every requested quantity against the
    /// current counters, failing fast on the first short product.
    ///
    /// An optimization for early, product-specific feedback. The atomic
    /// guard inside [`Self::apply_delta`] is the correctness boundary; a
    /// pass here can still lose the race to a concurrent order.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn check_availability(&self, items: &[StockRequest]) -> Result<(), ServiceError> {
        for item in items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&*self.db)
                .await
                .map_err(|e| {
                    error!(error = %e, product_id = %item.product_id, "failed to read product stock");
                    ServiceError::DatabaseError(e)
                })?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            if product.stock < item.quantity {
                warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    available = product.stock,
                    "insufficient stock"
                );
                return Err(ServiceError::InsufficientStock(item.product_id));
            }
        }
        Ok(())
    }

    /// Applies a batch of signed adjustments inside the caller's
    /// transaction. Each consuming adjustment is a conditional update that
    /// refuses to drive the counter negative; a refusal surfaces
    /// `StockViolation` and the caller's transaction rolls back, so the
    /// batch is all-or-nothing.
    pub async fn apply_delta(
        &self,
        txn: &DatabaseTransaction,
        adjustments: &[StockAdjustment],
    ) -> Result<(), ServiceError> {
        for adj in adjustments {
            if adj.delta == 0 {
                continue;
            }

            let mut update = ProductEntity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).add(adj.delta),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::Id.eq(adj.product_id));

            if adj.delta < 0 {
                update = update.filter(product::Column::Stock.gte(-adj.delta));
            }

            let result = update.exec(txn).await.map_err(|e| {
                error!(error = %e, product_id = %adj.product_id, "stock adjustment failed");
                ServiceError::DatabaseError(e)
            })?;

            if result.rows_affected == 0 {
                let exists = ProductEntity::find_by_id(adj.product_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .is_some();

                return if exists {
                    warn!(
                        product_id = %adj.product_id,
                        delta = adj.delta,
                        "stock guard refused adjustment; rolling back"
                    );
                    Err(ServiceError::StockViolation)
                } else {
                    Err(ServiceError::NotFound(format!(
                        "Product {} not found",
                        adj.product_id
                    )))
                };
            }
        }
        Ok(())
    }

    /// Staff restock or correction. Runs the guarded adjustment in its own
    /// transaction and emits stock events after commit.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        delta: i32,
    ) -> Result<product::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        self.apply_delta(&txn, &[StockAdjustment { product_id, delta }])
            .await?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            product_id = %product_id,
            delta = delta,
            remaining = product.stock,
            "stock adjusted"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::StockAdjusted {
                product_id,
                delta,
                remaining: product.stock,
            })
            .await
        {
            warn!(error = %e, product_id = %product_id, "failed to send stock adjusted event");
        }
        self.emit_low_stock(&product).await;

        Ok(product)
    }

    /// Products at or below their low-stock threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        ProductEntity::find()
            .filter(
                Expr::col(product::Column::Stock)
                    .lte(Expr::col(product::Column::LowStockThreshold)),
            )
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to list low-stock products");
                ServiceError::DatabaseError(e)
            })
    }

    pub(crate) async fn emit_low_stock(&self, product: &product::Model) {
        if product.stock <= product.low_stock_threshold {
            if let Err(e) = self
                .event_sender
                .send(Event::LowStock {
                    product_id: product.id,
                    stock: product.stock,
                    threshold: product.low_stock_threshold,
                })
                .await
            {
                warn!(error = %e, product_id = %product.id, "failed to send low stock event");
            }
        }
    }
}
