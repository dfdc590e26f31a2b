use crate::{
    entities::category::{self, Entity as CategoryEntity},
    entities::dining_table::{self, Entity as TableEntity},
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    services::boundaries::{Period, TimeRange},
    services::restaurant::RestaurantContext,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Headline figures for the staff dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryStats {
    pub total_orders: u64,
    pub revenue: Decimal,
    /// Point-in-time catalog size, not period-filtered.
    pub total_products: u64,
}

/// One slice of a breakdown chart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BreakdownEntry {
    pub id: String,
    pub label: String,
    pub value: i64,
}

/// Sold quantities grouped by category and by product over a window.
/// Categories and products with no qualifying activity are absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryBreakdown {
    pub categories_data: Vec<BreakdownEntry>,
    pub orders_data: Vec<BreakdownEntry>,
}

/// One row of the staff order list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub table_id: Uuid,
    pub table_name: Option<String>,
    pub client_name: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemDetails {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    /// Unit price frozen at order time.
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    pub id: Uuid,
    pub table_id: Uuid,
    pub table_name: Option<String>,
    pub client_name: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemDetails>,
}

/// Read-only statistical views over the order history. No mutation and no
/// invariant beyond correct counting; either the full structure comes back
/// or an error does.
#[derive(Clone)]
pub struct StatisticsService {
    db: Arc<DatabaseConnection>,
}

impl StatisticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Order count and revenue within the period, plus the catalog size.
    #[instrument(skip(self, ctx))]
    pub async fn summary(
        &self,
        ctx: &RestaurantContext,
        period: Period,
    ) -> Result<SummaryStats, ServiceError> {
        let range = TimeRange::resolve(period);

        let orders = filter_window(OrderEntity::find(), order::Column::CreatedAt, range)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let revenue: Decimal = orders.iter().map(|o| o.total).sum();

        let total_products = ProductEntity::find()
            .filter(product::Column::RestaurantId.eq(ctx.restaurant_id))
            .count(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(SummaryStats {
            total_orders: orders.len() as u64,
            revenue,
            total_products,
        })
    }

    /// Sold quantities per category and per product within the period.
    ///
    /// A category with products but no qualifying order items in the window
    /// does not appear at all, and neither do its silent products.
    #[instrument(skip(self, ctx))]
    pub async fn category_breakdown(
        &self,
        ctx: &RestaurantContext,
        period: Period,
    ) -> Result<CategoryBreakdown, ServiceError> {
        let range = TimeRange::resolve(period);

        let categories = CategoryEntity::find()
            .filter(category::Column::RestaurantId.eq(ctx.restaurant_id))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let products = ProductEntity::find()
            .filter(product::Column::RestaurantId.eq(ctx.restaurant_id))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let items = filter_window(
            OrderItemEntity::find().filter(order_item::Column::ProductId.is_in(product_ids)),
            order_item::Column::CreatedAt,
            range,
        )
        .all(&*self.db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        let mut sold_per_product: HashMap<Uuid, i64> = HashMap::new();
        for item in &items {
            *sold_per_product.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
        }

        let mut sold_per_category: HashMap<Uuid, i64> = HashMap::new();
        let mut orders_data = Vec::new();
        for p in &products {
            let Some(sold) = sold_per_product.get(&p.id).copied() else {
                continue;
            };
            *sold_per_category.entry(p.category_id).or_insert(0) += sold;
            orders_data.push(BreakdownEntry {
                id: p.name.clone(),
                label: p.name.clone(),
                value: sold,
            });
        }

        let categories_data = categories
            .iter()
            .filter_map(|c| {
                sold_per_category.get(&c.id).map(|sold| BreakdownEntry {
                    id: c.name.clone(),
                    label: c.name.clone(),
                    value: *sold,
                })
            })
            .collect();

        Ok(CategoryBreakdown {
            categories_data,
            orders_data,
        })
    }

    /// The staff order list for the period, most recent first.
    #[instrument(skip(self))]
    pub async fn orders(&self, period: Period) -> Result<Vec<OrderSummary>, ServiceError> {
        let range = TimeRange::resolve(period);

        let orders = filter_window(OrderEntity::find(), order::Column::CreatedAt, range)
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let table_ids: Vec<Uuid> = orders.iter().map(|o| o.table_id).collect();
        let tables: HashMap<Uuid, String> = TableEntity::find()
            .filter(dining_table::Column::Id.is_in(table_ids))
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        Ok(orders
            .into_iter()
            .map(|o| OrderSummary {
                id: o.id,
                table_id: o.table_id,
                table_name: tables.get(&o.table_id).cloned(),
                client_name: o.client_name,
                status: o.status,
                total: o.total,
                created_at: o.created_at,
                updated_at: o.updated_at,
            })
            .collect())
    }

    /// Full projection of one order with its lines.
    #[instrument(skip(self))]
    pub async fn order_details(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order_model = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order_model
            .find_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let table_name = TableEntity::find_by_id(order_model.table_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .map(|t| t.name);

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let product_names: HashMap<Uuid, String> = ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(OrderDetails {
            id: order_model.id,
            table_id: order_model.table_id,
            table_name,
            client_name: order_model.client_name,
            status: order_model.status,
            total: order_model.total,
            created_at: order_model.created_at,
            updated_at: order_model.updated_at,
            items: items
                .into_iter()
                .map(|item| OrderItemDetails {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: product_names.get(&item.product_id).cloned(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        })
    }
}

fn filter_window<E: EntityTrait>(
    query: Select<E>,
    column: impl ColumnTrait + Copy,
    range: TimeRange,
) -> Select<E> {
    let mut query = query;
    if let Some(start) = range.start {
        query = query.filter(column.gte(start));
    }
    if let Some(end) = range.end {
        query = query.filter(column.lt(end));
    }
    query
}
