pub mod checkout;
pub mod common;
pub mod health;
pub mod products;
pub mod shipping;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    services::{
        catalog::ProductCatalogService,
        checkout::{payment_provider_from_config, CheckoutService, PaymentSessionCreator},
        shipping::{CorreiosRateQuoter, RateQuoter, ShippingQuoteService},
    },
};
use std::sync::Arc;

/// Services shared by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub shipping: Arc<ShippingQuoteService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    /// Wire services against the configured carrier and payment provider.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Result<Self, ServiceError> {
        let quoter: Arc<dyn RateQuoter> = Arc::new(CorreiosRateQuoter::new(config.carrier.clone())?);
        let payments = payment_provider_from_config(&config.payment)?;
        Ok(Self::with_collaborators(db_pool, config, quoter, payments))
    }

    /// Wire services with explicit carrier and payment collaborators.
    pub fn with_collaborators(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        quoter: Arc<dyn RateQuoter>,
        payments: Arc<dyn PaymentSessionCreator>,
    ) -> Self {
        Self {
            catalog: Arc::new(ProductCatalogService::new(db_pool)),
            shipping: Arc::new(ShippingQuoteService::new(quoter)),
            checkout: Arc::new(CheckoutService::new(payments, &config.payment)),
        }
    }
}
