use crate::{
    entities::category::{self, Entity as CategoryEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::restaurant::RestaurantContext,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// A category with its product count.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: category::Model,
    pub product_count: u64,
}

/// Manages menu categories. A category owns its products: the cascade
/// delete below is the single, explicit place that relationship is
/// exercised destructively.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    pub async fn get(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        CategoryEntity::find_by_id(category_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
    }

    #[instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &RestaurantContext,
    ) -> Result<Vec<CategorySummary>, ServiceError> {
        let categories = CategoryEntity::find()
            .filter(category::Column::RestaurantId.eq(ctx.restaurant_id))
            .order_by_desc(category::Column::UpdatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut summaries = Vec::with_capacity(categories.len());
        for cat in categories {
            let product_count = ProductEntity::find()
                .filter(product::Column::CategoryId.eq(cat.id))
                .count(&*self.db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            summaries.push(CategorySummary {
                category: cat,
                product_count,
            });
        }
        Ok(summaries)
    }

    #[instrument(skip(self, ctx))]
    pub async fn create(
        &self,
        ctx: &RestaurantContext,
        name: String,
        description: Option<String>,
    ) -> Result<category::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(description),
            restaurant_id: Set(ctx.restaurant_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        category_id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<category::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".to_string(),
            ));
        }

        let category = self.get(category_id).await?;
        let mut active: category::ActiveModel = category.into();
        active.name = Set(name);
        active.description = Set(description);
        active.updated_at = Set(Utc::now());
        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a category and destroys every product it owns, in one
    /// transaction. Order items referencing the destroyed products survive:
    /// they hold a weak product reference and a frozen price.
    #[instrument(skip(self))]
    pub async fn delete_category_cascade(&self, category_id: Uuid) -> Result<u64, ServiceError> {
        let category = self.get(category_id).await?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, category_id = %category_id, "failed to start cascade transaction");
            ServiceError::DatabaseError(e)
        })?;

        let removed = ProductEntity::delete_many()
            .filter(product::Column::CategoryId.eq(category_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .rows_affected;

        category
            .delete(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            category_id = %category_id,
            products_removed = removed,
            "category deleted with its products"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::CategoryDeleted {
                category_id,
                products_removed: removed,
            })
            .await
        {
            warn!(error = %e, category_id = %category_id, "failed to send category deleted event");
        }

        Ok(removed)
    }
}
