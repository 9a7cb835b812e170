use std::{collections::HashMap, str::FromStr};

use rust_decimal::Decimal;
use url::Url;

use crate::{service::pricing::DEFAULT_TAX_RATE, utils};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_INTENT_TTL_SECS: i64 = 30 * 60;
const MAX_INTENT_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_GATEWAY_FAILURES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0}")]
    MissingKey(String),
    #[error("Invalid {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Where configuration values come from.
pub trait SecretSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads `VOXSHIFT_*` keys from the process environment.
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MapSecrets(HashMap<String, String>);

impl MapSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }
}

impl SecretSource for MapSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: Url,
    pub publishable_key: String,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn is_test_mode(&self) -> bool {
        self.publishable_key.starts_with("pk_test_")
    }
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub tax_rate: Decimal,
    pub currency: String,
    pub intent_ttl_secs: i64,
    /// Consecutive gateway failures before the session is moved to `failed`. Zero never fails it.
    pub max_gateway_failures: u32,
    pub test_mode: bool,
}

impl CheckoutConfig {
    /// Clamped to between one second and one week when set outside `build_config`.
    pub fn intent_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.intent_ttl_secs.clamp(1, MAX_INTENT_TTL_SECS))
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            currency: DEFAULT_CURRENCY.to_string(),
            intent_ttl_secs: DEFAULT_INTENT_TTL_SECS,
            max_gateway_failures: DEFAULT_MAX_GATEWAY_FAILURES,
            test_mode: false,
        }
    }
}

fn required(source: &impl SecretSource, key: &str) -> Result<String, ConfigError> {
    source.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn optional<T>(source: &impl SecretSource, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match source.get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn required_url(source: &impl SecretSource, key: &str) -> Result<Url, ConfigError> {
    let raw = required(source, key)?;
    let mut url = Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    // Url::join drops the last path segment unless the base ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn build_config(source: &impl SecretSource) -> Result<AppConfig, ConfigError> {
    info!("Building AppConfig...");

    let timeout_secs = optional(source, "VOXSHIFT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

    let backend = BackendConfig {
        base_url: required_url(source, "VOXSHIFT_BACKEND_URL")?,
        api_key: required(source, "VOXSHIFT_BACKEND_API_KEY")?,
        timeout_secs,
    };

    let gateway = GatewayConfig {
        base_url: required_url(source, "VOXSHIFT_GATEWAY_URL")?,
        publishable_key: required(source, "VOXSHIFT_GATEWAY_PUBLISHABLE_KEY")?,
        timeout_secs,
    };

    let tax_rate = optional(source, "VOXSHIFT_TAX_RATE", DEFAULT_TAX_RATE)?;
    if tax_rate.is_sign_negative() {
        return Err(ConfigError::InvalidValue {
            key: "VOXSHIFT_TAX_RATE".to_string(),
            reason: "must not be negative".to_string(),
        });
    }

    let currency = optional(source, "VOXSHIFT_CURRENCY", DEFAULT_CURRENCY.to_string())?.to_uppercase();
    if !utils::validate_currency(&currency) {
        return Err(ConfigError::InvalidValue {
            key: "VOXSHIFT_CURRENCY".to_string(),
            reason: format!("'{}' is not an ISO 4217 code", currency),
        });
    }

    let intent_ttl_secs = optional(source, "VOXSHIFT_INTENT_TTL_SECS", DEFAULT_INTENT_TTL_SECS)?;
    if !(1..=MAX_INTENT_TTL_SECS).contains(&intent_ttl_secs) {
        return Err(ConfigError::InvalidValue {
            key: "VOXSHIFT_INTENT_TTL_SECS".to_string(),
            reason: format!("must be between 1 and {}", MAX_INTENT_TTL_SECS),
        });
    }

    let checkout = CheckoutConfig {
        tax_rate,
        currency,
        intent_ttl_secs,
        max_gateway_failures: optional(source, "VOXSHIFT_MAX_GATEWAY_FAILURES", DEFAULT_MAX_GATEWAY_FAILURES)?,
        test_mode: gateway.is_test_mode(),
    };

    info!(
        "AppConfig built (currency: {}, tax rate: {}, test mode: {})",
        checkout.currency, checkout.tax_rate, checkout.test_mode
    );

    Ok(AppConfig {
        backend,
        gateway,
        checkout,
    })
}
