use crate::{
    entities::dining_table::{self, Entity as TableEntity},
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    services::boundaries::TimeRange,
    services::restaurant::RestaurantContext,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A table with its order activity over a window.
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub table: dining_table::Model,
    pub order_count: u64,
    pub revenue: Decimal,
}

/// Manages the dining tables, including the distinguished default table
/// used as the fallback target for orders without an explicit table.
#[derive(Clone)]
pub struct TableService {
    db: Arc<DatabaseConnection>,
    default_table_name: String,
}

impl TableService {
    pub fn new(db: Arc<DatabaseConnection>, default_table_name: String) -> Self {
        Self {
            db,
            default_table_name,
        }
    }

    pub async fn get(&self, table_id: Uuid) -> Result<dining_table::Model, ServiceError> {
        TableEntity::find_by_id(table_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Table {} not found", table_id)))
    }

    /// The restaurant's default table, created lazily on first use.
    #[instrument(skip(self, ctx))]
    pub async fn default_table(
        &self,
        ctx: &RestaurantContext,
    ) -> Result<dining_table::Model, ServiceError> {
        let existing = TableEntity::find()
            .filter(dining_table::Column::RestaurantId.eq(ctx.restaurant_id))
            .filter(dining_table::Column::IsDefault.eq(true))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if let Some(table) = existing {
            return Ok(table);
        }

        let now = Utc::now();
        let table = dining_table::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(self.default_table_name.clone()),
            restaurant_id: Set(ctx.restaurant_id),
            is_default: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        info!(table_id = %table.id, "default table created");
        Ok(table)
    }

    /// All tables of the restaurant with their order count and revenue,
    /// optionally restricted to a time window.
    #[instrument(skip(self, ctx, range))]
    pub async fn list_with_activity(
        &self,
        ctx: &RestaurantContext,
        range: Option<TimeRange>,
    ) -> Result<Vec<TableSummary>, ServiceError> {
        let tables = TableEntity::find()
            .filter(dining_table::Column::RestaurantId.eq(ctx.restaurant_id))
            .order_by_desc(dining_table::Column::UpdatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let table_ids: Vec<Uuid> = tables.iter().map(|t| t.id).collect();

        let mut query = OrderEntity::find().filter(order::Column::TableId.is_in(table_ids));
        if let Some(range) = range {
            if let Some(start) = range.start {
                query = query.filter(order::Column::CreatedAt.gte(start));
            }
            if let Some(end) = range.end {
                query = query.filter(order::Column::CreatedAt.lt(end));
            }
        }
        let orders = query
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut by_table: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
        for order_model in &orders {
            let entry = by_table
                .entry(order_model.table_id)
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += order_model.total;
        }

        Ok(tables
            .into_iter()
            .map(|table| {
                let (order_count, revenue) =
                    by_table.get(&table.id).copied().unwrap_or((0, Decimal::ZERO));
                TableSummary {
                    table,
                    order_count,
                    revenue,
                }
            })
            .collect())
    }

    #[instrument(skip(self, ctx))]
    pub async fn create(
        &self,
        ctx: &RestaurantContext,
        name: String,
    ) -> Result<dining_table::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Table name must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let table = dining_table::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            restaurant_id: Set(ctx.restaurant_id),
            is_default: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        info!(table_id = %table.id, name = %table.name, "table created");
        Ok(table)
    }

    /// Renames a table. The default table is exempt.
    #[instrument(skip(self))]
    pub async fn rename(
        &self,
        table_id: Uuid,
        name: String,
    ) -> Result<dining_table::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Table name must not be empty".to_string(),
            ));
        }

        let table = self.get(table_id).await?;
        if table.is_default {
            return Err(ServiceError::InvalidOperation(
                "The default table cannot be renamed".to_string(),
            ));
        }

        let mut active: dining_table::ActiveModel = table.into();
        active.name = Set(name);
        active.updated_at = Set(Utc::now());
        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a table. The default table is exempt.
    #[instrument(skip(self))]
    pub async fn delete(&self, table_id: Uuid) -> Result<(), ServiceError> {
        let table = self.get(table_id).await?;
        if table.is_default {
            return Err(ServiceError::InvalidOperation(
                "The default table cannot be deleted".to_string(),
            ));
        }

        TableEntity::delete_by_id(table_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(table_id = %table_id, "table deleted");
        Ok(())
    }
}
