use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product record
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    /// JSON array of image URLs
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub stock: i32,
    /// Barcode (EAN-13)
    pub ean: String,
    /// Trade unit the product is sold by ("garrafa", "caixa", ...)
    pub sale_unit: String,
    pub volume: String,
    pub units_per_case: i32,
    pub minimum_quantity: String,
    pub unit_weight: String,
    pub case_weight: String,
    /// Mercosur tax classification code
    pub ncm: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Image URLs in storage order; non-string entries are skipped.
    pub fn image_urls(&self) -> Vec<String> {
        self.images
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First image, used as the listing thumbnail.
    pub fn primary_image(&self) -> Option<String> {
        self.image_urls().into_iter().next()
    }
}
