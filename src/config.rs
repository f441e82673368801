use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 4000;
const CONFIG_DIR: &str = "config";

const DEFAULT_RATE_ENDPOINT: &str = "http://cws.correios.com.br/calculador/CalcPrecoPrazo.aspx";
const DEFAULT_ORIGIN_POSTAL_CODE: &str = "37704273";
const DEFAULT_STANDARD_SERVICE: &str = "04510";
const DEFAULT_EXPRESS_SERVICE: &str = "04014";
const DEFAULT_CARRIER_TIMEOUT_SECS: u64 = 20;

const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "brl";
const DEFAULT_SHIPPING_COUNTRY: &str = "BR";
const DEFAULT_SHIPPING_LINE_NAME: &str = "Custo de Envio";
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 30;

/// Carrier rate lookup configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CarrierConfig {
    /// Legacy price/deadline calculator endpoint
    #[serde(default = "default_rate_endpoint")]
    #[validate(url)]
    pub rate_endpoint: String,

    /// Postal code every parcel ships from (8 digits)
    #[serde(default = "default_origin_postal_code")]
    #[validate(custom = "validate_postal_code")]
    pub origin_postal_code: String,

    /// Package format code (1 = box/parcel)
    #[serde(default = "default_package_format")]
    pub package_format: u8,

    /// Package dimensions in centimetres
    #[serde(default = "default_package_length")]
    pub package_length_cm: u32,
    #[serde(default = "default_package_height")]
    pub package_height_cm: u32,
    #[serde(default = "default_package_width")]
    pub package_width_cm: u32,
    #[serde(default)]
    pub package_diameter_cm: u32,

    /// Service code quoted as the standard option
    #[serde(default = "default_standard_service")]
    #[validate(length(min = 1))]
    pub standard_service_code: String,

    /// Service code quoted as the express option
    #[serde(default = "default_express_service")]
    #[validate(length(min = 1))]
    pub express_service_code: String,

    /// Hard timeout for the carrier call
    #[serde(default = "default_carrier_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            rate_endpoint: default_rate_endpoint(),
            origin_postal_code: default_origin_postal_code(),
            package_format: default_package_format(),
            package_length_cm: default_package_length(),
            package_height_cm: default_package_height(),
            package_width_cm: default_package_width(),
            package_diameter_cm: 0,
            standard_service_code: default_standard_service(),
            express_service_code: default_express_service(),
            timeout_secs: default_carrier_timeout_secs(),
        }
    }
}

/// Payment provider configuration
#[derive(Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Provider secret key; checkout is disabled without it
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Provider API base URL
    #[serde(default = "default_payment_api_base")]
    #[validate(url)]
    pub api_base: String,

    /// ISO currency code used for every line item
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Countries accepted for the shipping address, comma-separated
    #[serde(default = "default_shipping_countries")]
    pub allowed_shipping_countries: String,

    /// Display name of the synthetic shipping line item
    #[serde(default = "default_shipping_line_name")]
    #[validate(length(min = 1))]
    pub shipping_line_name: String,

    #[serde(default = "default_payment_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl PaymentConfig {
    pub fn allowed_countries(&self) -> Vec<String> {
        self.allowed_shipping_countries
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

// The secret key must never reach the logs.
impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("allowed_shipping_countries", &self.allowed_shipping_countries)
            .field("shipping_line_name", &self.shipping_line_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: default_payment_api_base(),
            currency: default_currency(),
            allowed_shipping_countries: default_shipping_countries(),
            shipping_line_name: default_shipping_line_name(),
            timeout_secs: default_payment_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Catalog store connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Carrier rate lookup settings
    #[serde(default)]
    #[validate]
    pub carrier: CarrierConfig,

    /// Payment provider settings
    #[serde(default)]
    #[validate]
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            carrier: CarrierConfig::default(),
            payment: PaymentConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        matches!(
            self.environment.to_ascii_lowercase().as_str(),
            "development" | "dev" | "local" | "test"
        )
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| raw.split(',').any(|o| !o.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || self.is_development()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            let mut err = ValidationError::new("cors_allowed_origins");
            err.message = Some(
                "Set cors_allowed_origins or cors_allow_any_origin outside development".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        let has_payment_key = self
            .payment
            .secret_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if self.is_production() && !has_payment_key {
            let mut err = ValidationError::new("payment_secret_key");
            err.message = Some("payment.secret_key is required in production".into());
            errors.add("payment", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_rate_endpoint() -> String {
    DEFAULT_RATE_ENDPOINT.to_string()
}
fn default_origin_postal_code() -> String {
    DEFAULT_ORIGIN_POSTAL_CODE.to_string()
}
fn default_package_format() -> u8 {
    1
}
fn default_package_length() -> u32 {
    20
}
fn default_package_height() -> u32 {
    2
}
fn default_package_width() -> u32 {
    11
}
fn default_standard_service() -> String {
    DEFAULT_STANDARD_SERVICE.to_string()
}
fn default_express_service() -> String {
    DEFAULT_EXPRESS_SERVICE.to_string()
}
fn default_carrier_timeout_secs() -> u64 {
    DEFAULT_CARRIER_TIMEOUT_SECS
}

fn default_payment_api_base() -> String {
    DEFAULT_PAYMENT_API_BASE.to_string()
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_shipping_countries() -> String {
    DEFAULT_SHIPPING_COUNTRY.to_string()
}
fn default_shipping_line_name() -> String {
    DEFAULT_SHIPPING_LINE_NAME.to_string()
}
fn default_payment_timeout_secs() -> u64 {
    DEFAULT_PAYMENT_TIMEOUT_SECS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_postal_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 8 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("postal_code");
        err.message = Some("Postal code must contain exactly 8 digits".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt().with_env_filter(EnvFilter::new(filter_directive));
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let selected_env = env::var("RUN_ENV").or_else(|_| env::var("APP_ENV")).ok();
    load_config_for_env(config_dir, selected_env.as_deref())
}

/// Load configuration for an explicitly selected environment profile.
///
/// A selected environment always wins over an `environment` key found in the
/// config files, so the production checks cannot be bypassed by a shared
/// `default.toml`.
pub fn load_config_for_env(
    config_dir: &Path,
    selected_env: Option<&str>,
) -> Result<AppConfig, AppConfigError> {
    let selected_env = selected_env.map(str::trim).filter(|e| !e.is_empty());
    let run_env = selected_env.unwrap_or(DEFAULT_ENV).to_string();
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let default_file = config_dir.join("default");
    let env_file = config_dir.join(&run_env);

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));
    if let Some(selected) = selected_env {
        builder = builder.set_override("environment", selected)?;
    }
    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint check failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
