use crate::{
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{InventoryService, StockAdjustment, StockRequest},
    services::restaurant::RestaurantContext,
    services::tables::TableService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One requested line of a new order. The unit price is supplied by the
/// caller and frozen onto the order item.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// One line of the revised item list handed to [`OrderService::complete`].
/// A quantity of zero removes the line.
#[derive(Debug, Clone, Copy)]
pub struct RevisedItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// An order together with its current item rows.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Drives an order through PENDING → IN_PROGRESS → COMPLETED/CANCELED while
/// reconciling the stock ledger. The only component that consumes stock.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    inventory: InventoryService,
    tables: TableService,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        inventory: InventoryService,
        tables: TableService,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
            tables,
        }
    }

    /// Creates an order and consumes stock for every line, atomically.
    ///
    /// Without an explicit table the restaurant's default table is resolved
    /// (created lazily on first use). The advisory availability check runs
    /// first for fast, product-specific feedback; the conditional decrement
    /// inside the transaction is what actually protects the stock counters.
    /// Nothing persists if any step fails.
    #[instrument(skip(self, ctx, items), fields(item_count = items.len()))]
    pub async fn launch(
        &self,
        ctx: &RestaurantContext,
        table_id: Option<Uuid>,
        client_name: Option<String>,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderRecord, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::EmptyOrder);
        }

        let mut seen = HashSet::new();
        for item in &items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if item.unit_price.is_sign_negative() {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price for product {} must not be negative",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} appears more than once",
                    item.product_id
                )));
            }
        }

        let table = match table_id {
            Some(id) => self.tables.get(id).await?,
            None => self.tables.default_table(ctx).await?,
        };

        let requests: Vec<StockRequest> = items
            .iter()
            .map(|i| StockRequest {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect();
        self.inventory.check_availability(&requests).await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let total: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            table_id: Set(table.id),
            client_name: Set(client_name),
            status: Set(OrderStatus::Pending),
            total: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to insert order");
            ServiceError::OrderCreationFailed(e.to_string())
        })?;

        let mut item_models = Vec::with_capacity(items.len());
        for item in &items {
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.unit_price),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to insert order item");
                ServiceError::OrderCreationFailed(e.to_string())
            })?;
            item_models.push(model);
        }

        let adjustments: Vec<StockAdjustment> = items
            .iter()
            .map(|i| StockAdjustment {
                product_id: i.product_id,
                delta: -i.quantity,
            })
            .collect();
        // A guard refusal here aborts the whole transaction: no order, no
        // items, no stock change survive.
        self.inventory.apply_delta(&txn, &adjustments).await?;

        let remaining = self.load_products(&txn, seen.iter().copied()).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to commit order creation");
            ServiceError::OrderCreationFailed(e.to_string())
        })?;

        info!(order_id = %order_id, table_id = %table.id, total = %total, "order placed");

        if let Err(e) = self.event_sender.send(Event::OrderPlaced(order_id)).await {
            warn!(error = %e, order_id = %order_id, "failed to send order placed event");
        }
        for product in remaining.values() {
            self.inventory.emit_low_stock(product).await;
        }

        Ok(OrderRecord {
            order: order_model,
            items: item_models,
        })
    }

    /// Completes (validates) an order against a revised item list.
    ///
    /// The net stock change per product is the difference between the
    /// revised and previously committed quantities: raising a line consumes
    /// more stock, lowering it returns stock, and a line absent from the
    /// revision returns everything it had consumed. Item replacement, the
    /// recomputed total, the status flip and the stock deltas commit as one
    /// unit or not at all.
    #[instrument(skip(self, revised), fields(revised_count = revised.len()))]
    pub async fn complete(
        &self,
        order_id: Uuid,
        revised: Vec<RevisedItem>,
    ) -> Result<OrderRecord, ServiceError> {
        let mut seen = HashSet::new();
        for item in &revised {
            if item.quantity < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must not be negative",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} appears more than once",
                    item.product_id
                )));
            }
        }

        let order_model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order_model.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is already {:?}",
                order_id, order_model.status
            )));
        }

        let previous_items = order_model
            .find_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let previous: HashMap<Uuid, &order_item::Model> = previous_items
            .iter()
            .map(|item| (item.product_id, item))
            .collect();
        let previous_quantities: HashMap<Uuid, i32> = previous_items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();

        let adjustments = compute_adjustments(&previous_quantities, &revised);

        // Everything touched: revised lines plus lines being removed.
        let involved: HashSet<Uuid> = revised
            .iter()
            .map(|r| r.product_id)
            .chain(previous.keys().copied())
            .collect();
        let products = self.load_products(&*self.db, involved.iter().copied()).await?;

        // Advisory pass before any write, naming the first short product.
        for (product_id, adjustment) in &adjustments {
            let product = products.get(product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", product_id))
            })?;
            if product.stock - adjustment < 0 {
                warn!(
                    order_id = %order_id,
                    product_id = %product_id,
                    adjustment = adjustment,
                    available = product.stock,
                    "insufficient stock for revision"
                );
                return Err(ServiceError::InsufficientStock(*product_id));
            }
        }

        // Price resolution: the frozen price when the product was already on
        // the order, otherwise the product's live price.
        let mut new_lines: Vec<(Uuid, i32, Decimal)> = Vec::new();
        for item in revised.iter().filter(|r| r.quantity > 0) {
            let price = match previous.get(&item.product_id) {
                Some(existing) => existing.price,
                None => {
                    products
                        .get(&item.product_id)
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                item.product_id
                            ))
                        })?
                        .price
                }
            };
            new_lines.push((item.product_id, item.quantity, price));
        }

        let total: Decimal = new_lines
            .iter()
            .map(|(_, quantity, price)| *price * Decimal::from(*quantity))
            .sum();
        let now = Utc::now();
        let old_status = order_model.status;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to start transaction for completion");
            ServiceError::DatabaseError(e)
        })?;

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to clear order items");
                ServiceError::OrderCompletionFailed(e.to_string())
            })?;

        let mut item_models = Vec::with_capacity(new_lines.len());
        for (product_id, quantity, price) in &new_lines {
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(*product_id),
                quantity: Set(*quantity),
                price: Set(*price),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to insert revised item");
                ServiceError::OrderCompletionFailed(e.to_string())
            })?;
            item_models.push(model);
        }

        let mut active: order::ActiveModel = order_model.into();
        active.status = Set(OrderStatus::Completed);
        active.total = Set(total);
        active.updated_at = Set(now);
        let updated_order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to update order");
            ServiceError::OrderCompletionFailed(e.to_string())
        })?;

        // The guard re-validates every consuming delta; the advisory pass
        // above may have read stale counters.
        let deltas: Vec<StockAdjustment> = adjustments
            .iter()
            .map(|(product_id, adjustment)| StockAdjustment {
                product_id: *product_id,
                delta: -adjustment,
            })
            .collect();
        self.inventory.apply_delta(&txn, &deltas).await?;

        let remaining = self.load_products(&txn, involved.iter().copied()).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to commit order completion");
            ServiceError::OrderCompletionFailed(e.to_string())
        })?;

        info!(order_id = %order_id, total = %total, "order completed");

        if let Err(e) = self.event_sender.send(Event::OrderCompleted(order_id)).await {
            warn!(error = %e, order_id = %order_id, "failed to send order completed event");
        }
        self.send_status_changed(order_id, old_status, OrderStatus::Completed)
            .await;
        for product in remaining.values() {
            self.inventory.emit_low_stock(product).await;
        }

        Ok(OrderRecord {
            order: updated_order,
            items: item_models,
        })
    }

    /// Cancels a live order and restores all of its consumed stock, exactly
    /// as completing with an empty revision would. The item rows and total
    /// are kept as the historical record.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: Uuid) -> Result<OrderRecord, ServiceError> {
        let order_model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order_model.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is already {:?}",
                order_id, order_model.status
            )));
        }

        let items = order_model
            .find_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let now = Utc::now();
        let old_status = order_model.status;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to start transaction for cancellation");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: order::ActiveModel = order_model.into();
        active.status = Set(OrderStatus::Canceled);
        active.updated_at = Set(now);
        let updated_order = active
            .update(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let restores: Vec<StockAdjustment> = items
            .iter()
            .map(|item| StockAdjustment {
                product_id: item.product_id,
                delta: item.quantity,
            })
            .collect();
        self.inventory.apply_delta(&txn, &restores).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, restored_lines = items.len(), "order canceled");

        if let Err(e) = self.event_sender.send(Event::OrderCanceled(order_id)).await {
            warn!(error = %e, order_id = %order_id, "failed to send order canceled event");
        }
        self.send_status_changed(order_id, old_status, OrderStatus::Canceled)
            .await;

        Ok(OrderRecord {
            order: updated_order,
            items,
        })
    }

    /// Marks a pending order as in preparation. No stock effect.
    #[instrument(skip(self))]
    pub async fn start_preparation(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order_model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order_model.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is {:?}, expected PENDING",
                order_id, order_model.status
            )));
        }

        let mut active: order::ActiveModel = order_model.into();
        active.status = Set(OrderStatus::InProgress);
        active.updated_at = Set(Utc::now());
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.send_status_changed(order_id, OrderStatus::Pending, OrderStatus::InProgress)
            .await;

        Ok(updated)
    }

    /// Current lifecycle status of an order. Pure read.
    #[instrument(skip(self))]
    pub async fn get_status(&self, order_id: Uuid) -> Result<OrderStatus, ServiceError> {
        let order_model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        Ok(order_model.status)
    }

    async fn send_status_changed(&self, order_id: Uuid, old: OrderStatus, new: OrderStatus) {
        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: format!("{:?}", old),
                new_status: format!("{:?}", new),
            })
            .await
        {
            warn!(error = %e, order_id = %order_id, "failed to send status changed event");
        }
    }

    async fn load_products<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        ids: impl Iterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, product::Model>, ServiceError> {
        let ids: Vec<Uuid> = ids.collect();
        let models = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(models.into_iter().map(|m| (m.id, m)).collect())
    }
}

/// Net per-product quantity changes between the committed and revised item
/// sets. Positive means more units consumed, negative means units returned.
/// Products absent from the revision contribute the full negative of their
/// previous quantity.
fn compute_adjustments(
    previous: &HashMap<Uuid, i32>,
    revised: &[RevisedItem],
) -> Vec<(Uuid, i32)> {
    let revised_ids: HashSet<Uuid> = revised.iter().map(|r| r.product_id).collect();
    let mut adjustments = Vec::new();

    for item in revised {
        let previous_quantity = previous.get(&item.product_id).copied().unwrap_or(0);
        let adjustment = item.quantity - previous_quantity;
        if adjustment != 0 {
            adjustments.push((item.product_id, adjustment));
        }
    }

    for (product_id, previous_quantity) in previous {
        if !revised_ids.contains(product_id) && *previous_quantity != 0 {
            adjustments.push((*product_id, -previous_quantity));
        }
    }

    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revised(product_id: Uuid, quantity: i32) -> RevisedItem {
        RevisedItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn increasing_a_line_consumes_the_difference() {
        let product = Uuid::new_v4();
        let previous = HashMap::from([(product, 2)]);

        let adjustments = compute_adjustments(&previous, &[revised(product, 5)]);
        assert_eq!(adjustments, vec![(product, 3)]);
    }

    #[test]
    fn lowering_a_line_returns_the_difference() {
        let product = Uuid::new_v4();
        let previous = HashMap::from([(product, 4)]);

        let adjustments = compute_adjustments(&previous, &[revised(product, 1)]);
        assert_eq!(adjustments, vec![(product, -3)]);
    }

    #[test]
    fn absent_line_returns_everything() {
        let product = Uuid::new_v4();
        let previous = HashMap::from([(product, 2)]);

        let adjustments = compute_adjustments(&previous, &[]);
        assert_eq!(adjustments, vec![(product, -2)]);
    }

    #[test]
    fn unchanged_line_contributes_nothing() {
        let product = Uuid::new_v4();
        let previous = HashMap::from([(product, 2)]);

        let adjustments = compute_adjustments(&previous, &[revised(product, 2)]);
        assert!(adjustments.is_empty());
    }

    #[test]
    fn new_line_consumes_its_full_quantity() {
        let old_product = Uuid::new_v4();
        let new_product = Uuid::new_v4();
        let previous = HashMap::from([(old_product, 1)]);

        let mut adjustments =
            compute_adjustments(&previous, &[revised(old_product, 1), revised(new_product, 3)]);
        adjustments.sort_by_key(|(_, adjustment)| *adjustment);

        assert_eq!(adjustments, vec![(new_product, 3)]);
    }
}
