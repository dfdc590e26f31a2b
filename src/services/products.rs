use crate::{
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
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

/// A product with its lifetime sales volume. `sold` is derived from the
/// historical order items, never stored.
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub product: product::Model,
    pub sold: i64,
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub images: Vec<String>,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
}

/// Catalog management. Stock is seeded at creation and afterwards only ever
/// changed through the inventory service; this service never assigns it.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// All products of the restaurant with their derived sales counts.
    #[instrument(skip(self, ctx))]
    pub async fn list_with_sales(
        &self,
        ctx: &RestaurantContext,
    ) -> Result<Vec<ProductSummary>, ServiceError> {
        let products = ProductEntity::find()
            .filter(product::Column::RestaurantId.eq(ctx.restaurant_id))
            .order_by_asc(product::Column::UpdatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let items = OrderItemEntity::find()
            .filter(order_item::Column::ProductId.is_in(product_ids))
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let mut sold: HashMap<Uuid, i64> = HashMap::new();
        for item in &items {
            *sold.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let count = sold.get(&p.id).copied().unwrap_or(0);
                ProductSummary {
                    product: p,
                    sold: count,
                }
            })
            .collect())
    }

    /// Products belonging to one category.
    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<product::Model>, ServiceError> {
        ProductEntity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        ctx: &RestaurantContext,
        input: CreateProduct,
    ) -> Result<product::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name must not be empty".to_string(),
            ));
        }
        if input.price.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "Product price must not be negative".to_string(),
            ));
        }
        if input.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Initial stock must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            stock: Set(input.stock),
            low_stock_threshold: Set(input.low_stock_threshold),
            images: Set(Some(serde_json::json!(input.images))),
            category_id: Set(input.category_id),
            restaurant_id: Set(ctx.restaurant_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Updates catalog metadata and price. The live price set here is what
    /// a completion resolves for lines added to an existing order; items
    /// already frozen keep their captured price.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        product_id: Uuid,
        input: UpdateProduct,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product name must not be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.price {
            if price.is_sign_negative() {
                return Err(ServiceError::ValidationError(
                    "Product price must not be negative".to_string(),
                ));
            }
            active.price = Set(price);
        }
        if let Some(threshold) = input.low_stock_threshold {
            active.low_stock_threshold = Set(threshold);
        }
        if let Some(images) = input.images {
            active.images = Set(Some(serde_json::json!(images)));
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a product. Historical order items keep their weak reference
    /// and frozen price.
    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get(product_id).await?;

        ProductEntity::delete_by_id(product.id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(product_id = %product_id, "product deleted");
        Ok(())
    }
}
