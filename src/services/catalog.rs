use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Catalog store operations over the `products` table
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List every product in insertion order
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        let products = Product::find()
            .order_by_asc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;
        info!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Create a new product; omitted attributes take their empty defaults
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.check()?;

        let product_id = Uuid::new_v4();
        let now = Utc::now();

        let product = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            price: Set(input.price),
            images: Set(images_json(input.images.unwrap_or_default())),
            description: Set(input.description.unwrap_or_default()),
            category: Set(input.category.unwrap_or_default()),
            stock: Set(input.stock.unwrap_or(0)),
            ean: Set(input.ean.unwrap_or_default()),
            sale_unit: Set(input.sale_unit.unwrap_or_default()),
            volume: Set(input.volume.unwrap_or_default()),
            units_per_case: Set(input.units_per_case.unwrap_or(0)),
            minimum_quantity: Set(input.minimum_quantity.unwrap_or_default()),
            unit_weight: Set(input.unit_weight.unwrap_or_default()),
            case_weight: Set(input.case_weight.unwrap_or_default()),
            ncm: Set(input.ncm.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    /// Merge the supplied fields into an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.check()?;

        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(images) = input.images {
            active.images = Set(images_json(images));
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(ean) = input.ean {
            active.ean = Set(ean);
        }
        if let Some(sale_unit) = input.sale_unit {
            active.sale_unit = Set(sale_unit);
        }
        if let Some(volume) = input.volume {
            active.volume = Set(volume);
        }
        if let Some(units_per_case) = input.units_per_case {
            active.units_per_case = Set(units_per_case);
        }
        if let Some(minimum_quantity) = input.minimum_quantity {
            active.minimum_quantity = Set(minimum_quantity);
        }
        if let Some(unit_weight) = input.unit_weight {
            active.unit_weight = Set(unit_weight);
        }
        if let Some(case_weight) = input.case_weight {
            active.case_weight = Set(case_weight);
        }
        if let Some(ncm) = input.ncm {
            active.ncm = Set(ncm);
        }

        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;
        info!("Updated product: {}", product_id);
        Ok(product)
    }

    /// Delete a product; a missing id is NotFound every time
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await.map_err(|err| {
            warn!("Delete requested for missing product {}", product_id);
            err
        })?;
        product.delete(&*self.db).await?;
        info!("Deleted product: {}", product_id);
        Ok(())
    }
}

fn images_json(images: Vec<String>) -> serde_json::Value {
    serde_json::Value::Array(images.into_iter().map(serde_json::Value::String).collect())
}

/// Bounds of the `products.price` column, DECIMAL(12, 2)
const PRICE_SCALE: u32 = 2;
const MAX_PRICE: Decimal = dec!(9999999999.99);

fn ensure_valid_price(price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "price must be greater than or equal to 0".to_string(),
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(ServiceError::ValidationError(format!(
            "price must have at most {} decimal places",
            PRICE_SCALE
        )));
    }
    if price > MAX_PRICE {
        return Err(ServiceError::ValidationError(format!(
            "price must not exceed {}",
            MAX_PRICE
        )));
    }
    Ok(())
}

fn ensure_non_negative(field: &str, value: Option<i32>) -> Result<(), ServiceError> {
    match value {
        Some(v) if v < 0 => Err(ServiceError::ValidationError(format!(
            "{} must be greater than or equal to 0",
            field
        ))),
        _ => Ok(()),
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub ean: Option<String>,
    pub sale_unit: Option<String>,
    pub volume: Option<String>,
    pub units_per_case: Option<i32>,
    pub minimum_quantity: Option<String>,
    pub unit_weight: Option<String>,
    pub case_weight: Option<String>,
    pub ncm: Option<String>,
}

impl CreateProductInput {
    fn check(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("name is required".to_string()));
        }
        ensure_valid_price(self.price)?;
        ensure_non_negative("stock", self.stock)?;
        ensure_non_negative("units_per_case", self.units_per_case)
    }
}

/// Input for a partial product update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub ean: Option<String>,
    pub sale_unit: Option<String>,
    pub volume: Option<String>,
    pub units_per_case: Option<i32>,
    pub minimum_quantity: Option<String>,
    pub unit_weight: Option<String>,
    pub case_weight: Option<String>,
    pub ncm: Option<String>,
}

impl UpdateProductInput {
    fn check(&self) -> Result<(), ServiceError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "name cannot be empty".to_string(),
            ));
        }
        if let Some(price) = self.price {
            ensure_valid_price(price)?;
        }
        ensure_non_negative("stock", self.stock)?;
        ensure_non_negative("units_per_case", self.units_per_case)
    }
}
