use crate::{config::CarrierConfig, errors::ServiceError, storefront::money::parse_brl};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

const EXPRESS_SERVICE_NAME: &str = "SEDEX";
const STANDARD_SERVICE_NAME: &str = "PAC";

/// A carrier service offered for a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingOption {
    /// Carrier service code, e.g. `04014`
    pub code: String,
    /// Display name, e.g. `SEDEX`
    pub service: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 23.5)]
    pub price: Decimal,
    /// Delivery estimate in business days
    pub deadline: u32,
}

/// Validated parcel description sent to the carrier
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    /// Exactly 8 digits
    pub destination_postal_code: String,
    /// Kilograms, strictly positive
    pub weight_kg: Decimal,
    /// Non-negative declared value in BRL
    pub declared_value: Decimal,
}

/// Source of shipping rates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateQuoter: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Vec<ShippingOption>, ServiceError>;
}

/// Normalize a postal code (CEP) to its 8 digits.
pub fn normalize_postal_code(input: &str) -> Result<String, ServiceError> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return Err(ServiceError::InvalidInput(
            "destination postal code must contain exactly 8 digits".to_string(),
        ));
    }
    Ok(digits)
}

/// Parse a parcel weight in kilograms; a comma is accepted as decimal separator.
pub fn parse_weight(input: &str) -> Result<Decimal, ServiceError> {
    let weight = Decimal::from_str(input.trim().replace(',', ".").as_str())
        .map_err(|_| ServiceError::InvalidInput("weight must be a number".to_string()))?;
    if weight <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "weight must be greater than zero".to_string(),
        ));
    }
    Ok(weight)
}

/// Declared value for insurance; absent, malformed or negative values count as zero.
pub fn parse_declared_value(input: Option<&str>) -> Decimal {
    input
        .and_then(|v| Decimal::from_str(v.trim().replace(',', ".").as_str()).ok())
        .filter(|v| *v >= Decimal::ZERO)
        .unwrap_or(Decimal::ZERO)
}

/// Shipping quote use case: validates the request then asks the carrier.
#[derive(Clone)]
pub struct ShippingQuoteService {
    quoter: Arc<dyn RateQuoter>,
}

impl ShippingQuoteService {
    pub fn new(quoter: Arc<dyn RateQuoter>) -> Self {
        Self { quoter }
    }

    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        destination_postal_code: Option<&str>,
        weight: Option<&str>,
        declared_value: Option<&str>,
    ) -> Result<Vec<ShippingOption>, ServiceError> {
        let destination = destination_postal_code
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ServiceError::InvalidInput("cepDestino is required".to_string()))?;
        let weight = weight
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ServiceError::InvalidInput("peso is required".to_string()))?;

        let request = QuoteRequest {
            destination_postal_code: normalize_postal_code(destination)?,
            weight_kg: parse_weight(weight)?,
            declared_value: parse_declared_value(declared_value),
        };

        let options = self.quoter.quote(&request).await?;
        info!(
            destination = %request.destination_postal_code,
            options = options.len(),
            "Shipping quoted"
        );
        Ok(options)
    }
}

/// Client for the Correios legacy price/deadline calculator
#[derive(Clone)]
pub struct CorreiosRateQuoter {
    client: reqwest::Client,
    config: CarrierConfig,
}

impl CorreiosRateQuoter {
    pub fn new(config: CarrierConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("carrier client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn query_params(&self, request: &QuoteRequest) -> Vec<(&'static str, String)> {
        let cfg = &self.config;
        vec![
            ("sCepOrigem", cfg.origin_postal_code.clone()),
            ("sCepDestino", request.destination_postal_code.clone()),
            ("nVlPeso", format!("{:.3}", request.weight_kg)),
            ("nCdFormato", cfg.package_format.to_string()),
            ("nVlComprimento", cfg.package_length_cm.to_string()),
            ("nVlAltura", cfg.package_height_cm.to_string()),
            ("nVlLargura", cfg.package_width_cm.to_string()),
            ("nVlDiametro", cfg.package_diameter_cm.to_string()),
            ("sCdMaoPropria", "N".to_string()),
            (
                "nVlValorDeclarado",
                format!("{:.2}", request.declared_value).replace('.', ","),
            ),
            ("sCdAvisoRecebimento", "N".to_string()),
            (
                "nCdServico",
                format!("{},{}", cfg.express_service_code, cfg.standard_service_code),
            ),
            ("nCdEmpresa", String::new()),
            ("sDsSenha", String::new()),
            ("StrRetorno", "xml".to_string()),
            ("nIndicaCalculo", "3".to_string()),
        ]
    }

    fn service_name(&self, code: &str) -> String {
        if code == self.config.express_service_code {
            EXPRESS_SERVICE_NAME.to_string()
        } else if code == self.config.standard_service_code {
            STANDARD_SERVICE_NAME.to_string()
        } else {
            code.to_string()
        }
    }
}

#[async_trait]
impl RateQuoter for CorreiosRateQuoter {
    #[instrument(skip(self), fields(destination = %request.destination_postal_code))]
    async fn quote(&self, request: &QuoteRequest) -> Result<Vec<ShippingOption>, ServiceError> {
        let response = self
            .client
            .get(&self.config.rate_endpoint)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("Carrier request timed out");
                    ServiceError::UpstreamUnavailable("carrier request timed out".to_string())
                } else {
                    warn!("Carrier request failed: {}", e);
                    ServiceError::UpstreamUnavailable(format!("carrier request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ServiceError::UpstreamUnavailable(format!("carrier response unreadable: {}", e))
        })?;

        if status != reqwest::StatusCode::OK {
            warn!(%status, "Carrier answered with an error status");
            return Err(ServiceError::UpstreamUnavailable(format!(
                "carrier answered HTTP {}",
                status.as_u16()
            )));
        }

        let entries = parse_carrier_response(&body)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.into_option(|code| self.service_name(code)))
            .collect())
    }
}

/// One `<cServico>` element as answered by the carrier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierService {
    pub code: String,
    pub price: String,
    pub deadline: String,
    pub error_code: String,
    pub error_message: String,
}

impl CarrierService {
    fn has_error(&self) -> bool {
        !self.error_code.is_empty() && self.error_code != "0"
    }

    /// Normalized option, or `None` for entries flagged as errors, without a
    /// positive price or without a readable delivery estimate.
    fn into_option(self, name_for: impl Fn(&str) -> String) -> Option<ShippingOption> {
        if self.has_error() {
            warn!(
                code = %self.code,
                error = %self.error_code,
                message = %self.error_message,
                "Dropping carrier service flagged as error"
            );
            return None;
        }
        let price = parse_brl(&self.price).filter(|p| *p > Decimal::ZERO)?;
        let deadline = match self.deadline.trim().parse::<u32>() {
            Ok(days) => days,
            Err(_) => {
                warn!(
                    code = %self.code,
                    deadline = %self.deadline,
                    "Dropping carrier service with unreadable delivery estimate"
                );
                return None;
            }
        };
        Some(ShippingOption {
            service: name_for(&self.code),
            code: self.code,
            price,
            deadline,
        })
    }
}

static SERVICE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<cServico>(.*?)</cServico>").expect("valid regex"));
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(\w+)>(.*?)</(\w+)>").expect("valid regex"));
static CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^<!\[CDATA\[(.*)\]\]>$").expect("valid regex"));

/// Extract the service entries from the carrier XML body.
pub fn parse_carrier_response(body: &str) -> Result<Vec<CarrierService>, ServiceError> {
    if !body.to_lowercase().contains("<servicos>") {
        return Err(ServiceError::UpstreamUnavailable(
            "malformed carrier response".to_string(),
        ));
    }

    Ok(SERVICE_BLOCK
        .captures_iter(body)
        .map(|block| {
            let mut service = CarrierService::default();
            for tag in TAG.captures_iter(&block[1]) {
                if !tag[1].eq_ignore_ascii_case(&tag[3]) {
                    continue;
                }
                let raw = tag[2].trim();
                let value = CDATA
                    .captures(raw)
                    .map_or(raw, |c| c.get(1).map_or(raw, |m| m.as_str()))
                    .trim()
                    .to_string();
                match tag[1].to_ascii_lowercase().as_str() {
                    "codigo" => service.code = value,
                    "valor" => service.price = value,
                    "prazoentrega" => service.deadline = value,
                    "erro" => service.error_code = value,
                    "msgerro" => service.error_message = value,
                    _ => {}
                }
            }
            service
        })
        .collect())
}
