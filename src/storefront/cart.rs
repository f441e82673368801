//! Shopping cart held by the storefront client.

use super::money::to_minor_units;
use crate::{
    entities::ProductModel,
    errors::ServiceError,
    services::{
        checkout::{CheckoutLineItem, CheckoutRequest},
        shipping::ShippingOption,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How selected shipping options contribute to the cart total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPolicy {
    /// One charge per order: the most expensive option selected on any line
    #[default]
    PerOrder,
    /// Every line's selected option is added to the total
    PerLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    /// Unit price captured when the product was added
    pub price: Decimal,
    pub image: Option<String>,
    /// Always at least 1 once stored in a cart
    pub quantity: u32,
    pub shipping: Option<ShippingOption>,
}

impl CartItem {
    /// Snapshot a catalog product into a cart line.
    pub fn from_product(product: &ProductModel, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.primary_image(),
            quantity: quantity.max(1),
            shipping: None,
        }
    }

    pub fn with_shipping(mut self, option: ShippingOption) -> Self {
        self.shipping = Some(option);
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
    policy: ShippingPolicy,
}

impl Cart {
    pub fn new(policy: ShippingPolicy) -> Self {
        Self {
            items: Vec::new(),
            policy,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn policy(&self) -> ShippingPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line; an existing line for the same product absorbs the quantity
    /// and takes the incoming shipping selection.
    pub fn add(&mut self, item: CartItem) {
        let quantity = item.quantity.max(1);
        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
                existing.shipping = item.shipping;
            }
            None => self.items.push(CartItem { quantity, ..item }),
        }
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        self.items.len() != before
    }

    /// Set a line's quantity, clamped to at least 1. Returns whether the line exists.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) -> bool {
        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            Some(line) => {
                line.quantity = quantity.max(1);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Sum of unit price times quantity, without shipping
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn shipping_total(&self) -> Decimal {
        let selected = self
            .items
            .iter()
            .filter_map(|line| line.shipping.as_ref().map(|s| s.price));
        match self.policy {
            ShippingPolicy::PerOrder => selected.max().unwrap_or(Decimal::ZERO),
            ShippingPolicy::PerLine => selected.sum(),
        }
    }

    pub fn total_price(&self) -> Decimal {
        self.subtotal() + self.shipping_total()
    }

    /// Build the checkout payload with amounts in minor units.
    pub fn to_checkout_request(
        &self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
        customer_email: Option<String>,
    ) -> Result<CheckoutRequest, ServiceError> {
        let items = self
            .items
            .iter()
            .map(|line| {
                Ok(CheckoutLineItem {
                    name: line.name.clone(),
                    amount: Decimal::from(minor_units(line.price)?),
                    quantity: line.quantity,
                    description: None,
                    images: line.image.clone().map(|image| vec![image]),
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let shipping = minor_units(self.shipping_total())?;

        Ok(CheckoutRequest {
            items,
            success_url: Some(success_url.into()),
            cancel_url: Some(cancel_url.into()),
            shipping_cost: (shipping > 0).then(|| Decimal::from(shipping)),
            customer_email,
        })
    }
}

fn minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    to_minor_units(amount)
        .ok_or_else(|| ServiceError::InvalidInput(format!("amount {} is out of range", amount)))
}
