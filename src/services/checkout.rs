use crate::{
    config::PaymentConfig,
    errors::{ServiceError, UpstreamFailure},
};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Cart line submitted for payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Unit amount in minor currency units (centavos); rounded to a whole number
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 4990)]
    pub amount: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Body of `POST /api/checkout`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutLineItem>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    /// Shipping charge in minor currency units
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>, example = 2350)]
    pub shipping_cost: Option<Decimal>,
    pub customer_email: Option<String>,
}

/// Hosted payment session handed back to the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: Option<String>,
}

/// Provider-facing line item with amounts already in whole minor units
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLineItem {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Session parameters sent to the payment provider
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSessionRequest {
    pub currency: String,
    pub line_items: Vec<PaymentLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub allowed_shipping_countries: Vec<String>,
}

/// Creates hosted checkout sessions with an external payment provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentSessionCreator: Send + Sync {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<CheckoutSession, ServiceError>;
}

/// Checkout use case: validates the cart and opens a provider session.
#[derive(Clone)]
pub struct CheckoutService {
    provider: Arc<dyn PaymentSessionCreator>,
    currency: String,
    shipping_line_name: String,
    allowed_shipping_countries: Vec<String>,
}

impl CheckoutService {
    pub fn new(provider: Arc<dyn PaymentSessionCreator>, config: &PaymentConfig) -> Self {
        Self {
            provider,
            currency: config.currency.to_lowercase(),
            shipping_line_name: config.shipping_line_name.clone(),
            allowed_shipping_countries: config.allowed_countries(),
        }
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let session_request = self.build_session_request(request)?;
        let session = self.provider.create_session(&session_request).await?;
        info!(session_id = %session.session_id, "Checkout session created");
        Ok(session)
    }

    fn build_session_request(
        &self,
        request: CheckoutRequest,
    ) -> Result<PaymentSessionRequest, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "No items provided for checkout".to_string(),
            ));
        }
        let success_url = required_url("successUrl", request.success_url)?;
        let cancel_url = required_url("cancelUrl", request.cancel_url)?;

        let mut line_items = request
            .items
            .into_iter()
            .map(|item| self.line_item(item))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(cost) = request.shipping_cost {
            let shipping = whole_minor_units("shippingCost", cost)?;
            if shipping > 0 {
                line_items.push(PaymentLineItem {
                    name: self.shipping_line_name.clone(),
                    description: None,
                    images: Vec::new(),
                    unit_amount: shipping,
                    quantity: 1,
                });
            }
        }

        let customer_email = request
            .customer_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(PaymentSessionRequest {
            currency: self.currency.clone(),
            line_items,
            success_url,
            cancel_url,
            customer_email,
            allowed_shipping_countries: self.allowed_shipping_countries.clone(),
        })
    }

    fn line_item(&self, item: CheckoutLineItem) -> Result<PaymentLineItem, ServiceError> {
        if item.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "item name is required".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity for '{}' must be at least 1",
                item.name
            )));
        }
        let unit_amount = whole_minor_units("amount", item.amount)?;

        Ok(PaymentLineItem {
            name: item.name,
            description: item.description.filter(|d| !d.trim().is_empty()),
            images: item.images.unwrap_or_default(),
            unit_amount,
            quantity: item.quantity,
        })
    }
}

fn required_url(field: &str, value: Option<String>) -> Result<String, ServiceError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ServiceError::ValidationError("successUrl and cancelUrl are required".to_string())
        })?;
    url::Url::parse(&value)
        .map_err(|_| ServiceError::ValidationError(format!("{} is not a valid URL", field)))?;
    Ok(value)
}

fn whole_minor_units(field: &str, amount: Decimal) -> Result<i64, ServiceError> {
    if amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        )));
    }
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError(format!("{} is out of range", field)))
}

/// Stripe Checkout Sessions client
#[derive(Clone)]
pub struct StripeSessionCreator {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeSessionCreator {
    pub fn new(config: &PaymentConfig, secret_key: String) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("payment client: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    fn form_params(request: &PaymentSessionRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("billing_address_collection".to_string(), "required".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, country) in request.allowed_shipping_countries.iter().enumerate() {
            params.push((
                format!("shipping_address_collection[allowed_countries][{}]", i),
                country.clone(),
            ));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            params.push((
                format!("{}[price_data][currency]", prefix),
                request.currency.clone(),
            ));
            params.push((
                format!("{}[price_data][product_data][name]", prefix),
                item.name.clone(),
            ));
            if let Some(description) = &item.description {
                params.push((
                    format!("{}[price_data][product_data][description]", prefix),
                    description.clone(),
                ));
            }
            for (j, image) in item.images.iter().enumerate() {
                params.push((
                    format!("{}[price_data][product_data][images][{}]", prefix, j),
                    image.clone(),
                ));
            }
            params.push((
                format!("{}[price_data][unit_amount]", prefix),
                item.unit_amount.to_string(),
            ));
            params.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
        }

        if let Some(email) = &request.customer_email {
            params.push(("customer_email".to_string(), email.clone()));
        }

        params
    }
}

#[async_trait]
impl PaymentSessionCreator for StripeSessionCreator {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&Self::form_params(request))
            .send()
            .await
            .map_err(|e| {
                warn!("Payment provider unreachable: {}", e);
                if e.is_timeout() {
                    ServiceError::UpstreamUnavailable("payment provider timed out".to_string())
                } else {
                    ServiceError::UpstreamError(UpstreamFailure {
                        status: 502,
                        code: None,
                        kind: None,
                        message: format!("payment provider unreachable: {}", e),
                    })
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ServiceError::UpstreamUnavailable(format!("payment response unreadable: {}", e))
        })?;

        if !status.is_success() {
            let failure = match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => UpstreamFailure {
                    status: status.as_u16(),
                    code: envelope.error.code,
                    kind: envelope.error.kind,
                    message: envelope
                        .error
                        .message
                        .unwrap_or_else(|| "Checkout session could not be created".to_string()),
                },
                Err(_) => UpstreamFailure {
                    status: status.as_u16(),
                    code: None,
                    kind: None,
                    message: "Checkout session could not be created".to_string(),
                },
            };
            warn!(
                status = failure.status,
                code = ?failure.code,
                "Payment provider rejected checkout session"
            );
            return Err(ServiceError::UpstreamError(failure));
        }

        let session: StripeSession = serde_json::from_str(&body).map_err(|e| {
            ServiceError::UpstreamError(UpstreamFailure {
                status: 502,
                code: None,
                kind: None,
                message: format!("unexpected payment provider response: {}", e),
            })
        })?;

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
        })
    }
}

/// Stand-in used when no payment secret key is configured
#[derive(Debug, Clone, Default)]
pub struct DisabledPaymentProvider;

#[async_trait]
impl PaymentSessionCreator for DisabledPaymentProvider {
    async fn create_session(
        &self,
        _request: &PaymentSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        Err(ServiceError::ServiceUnavailable(
            "payment provider is not configured".to_string(),
        ))
    }
}

/// Pick the provider matching the configuration.
pub fn payment_provider_from_config(
    config: &PaymentConfig,
) -> Result<Arc<dyn PaymentSessionCreator>, ServiceError> {
    match config.secret_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(Arc::new(StripeSessionCreator::new(
            config,
            key.to_string(),
        )?)),
        _ => {
            warn!("No payment secret key configured; checkout is disabled");
            Ok(Arc::new(DisabledPaymentProvider))
        }
    }
}
