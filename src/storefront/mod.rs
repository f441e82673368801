//! Client-side storefront logic: cart, catalog browsing and display helpers.

pub mod browse;
pub mod cart;
pub mod money;
pub mod slug;

pub use cart::{Cart, CartItem, ShippingPolicy};
