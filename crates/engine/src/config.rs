//! Engine configuration.
//!
//! Every knob has a default; `from_env()` overrides them from `CATALOG_*`
//! variables. Malformed values are rejected rather than silently defaulted.

use std::time::Duration;

use catalog_client::HttpConfig;
use catalog_observability::LogFormat;
use thiserror::Error;

use crate::errors::Continuation;
use crate::join::IntegrityPolicy;

pub const ENV_API_URL: &str = "CATALOG_API_URL";
pub const ENV_API_TOKEN: &str = "CATALOG_API_TOKEN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CATALOG_HTTP_TIMEOUT_SECS";
pub const ENV_PRICE_MARKUP: &str = "CATALOG_PRICE_MARKUP";
pub const ENV_INTEGRITY_POLICY: &str = "CATALOG_INTEGRITY_POLICY";
pub const ENV_ON_ERROR: &str = "CATALOG_ON_ERROR";
pub const ENV_LOG_FORMAT: &str = "CATALOG_LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_PRICE_MARKUP: f64 = 1.5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Settings for one [`CatalogContext`](crate::CatalogContext).
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
    /// Multiplier applied to every joined product price.
    pub price_markup: f64,
    /// What the category join does with a product whose category is unknown.
    pub integrity: IntegrityPolicy,
    /// What a failed branch publishes after reporting its error.
    pub on_error: Continuation,
    pub log_format: LogFormat,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            http_timeout: Duration::from_secs(30),
            price_markup: DEFAULT_PRICE_MARKUP,
            integrity: IntegrityPolicy::default(),
            on_error: Continuation::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl CatalogConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup` (unset keys return `None`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match lookup(ENV_API_URL) {
            Some(url) if !url.trim().is_empty() => config.api_url = url.trim().to_string(),
            _ => tracing::warn!("{ENV_API_URL} not set; using {DEFAULT_API_URL}"),
        }

        config.api_token = lookup(ENV_API_TOKEN).filter(|t| !t.is_empty());

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: ENV_HTTP_TIMEOUT_SECS,
                value: raw.clone(),
                reason: "expected whole seconds",
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(ENV_PRICE_MARKUP) {
            config.price_markup = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|m| m.is_finite() && *m > 0.0)
                .ok_or(ConfigError::Invalid {
                    key: ENV_PRICE_MARKUP,
                    value: raw.clone(),
                    reason: "expected a positive number",
                })?;
        }

        if let Some(raw) = lookup(ENV_INTEGRITY_POLICY) {
            config.integrity = IntegrityPolicy::parse(&raw).ok_or(ConfigError::Invalid {
                key: ENV_INTEGRITY_POLICY,
                value: raw.clone(),
                reason: "expected `skip` or `fail`",
            })?;
        }

        if let Some(raw) = lookup(ENV_ON_ERROR) {
            config.on_error = Continuation::parse(&raw).ok_or(ConfigError::Invalid {
                key: ENV_ON_ERROR,
                value: raw.clone(),
                reason: "expected `empty` or `complete`",
            })?;
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = LogFormat::parse(&raw).ok_or(ConfigError::Invalid {
                key: ENV_LOG_FORMAT,
                value: raw.clone(),
                reason: "expected `json` or `pretty`",
            })?;
        }

        Ok(config)
    }

    /// Transport settings derived from this config.
    pub fn http(&self) -> HttpConfig {
        let http = HttpConfig::new(self.api_url.clone()).with_timeout(self.http_timeout);
        match &self.api_token {
            Some(token) => http.with_token(token.clone()),
            None => http,
        }
    }
}

/// Install the process-wide subscriber in the configured format.
pub fn init_logging(config: &CatalogConfig) {
    catalog_observability::init_with(config.log_format);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.price_markup, 1.5);
        assert_eq!(config.integrity, IntegrityPolicy::SkipRecord);
        assert_eq!(config.on_error, Continuation::EmptyCollection);
    }

    #[test]
    fn overrides_are_applied() {
        let config = CatalogConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://shop.example/api"),
            (ENV_API_TOKEN, "secret"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
            (ENV_PRICE_MARKUP, "2"),
            (ENV_INTEGRITY_POLICY, "fail"),
            (ENV_ON_ERROR, "complete"),
            (ENV_LOG_FORMAT, "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://shop.example/api");
        assert_eq!(config.price_markup, 2.0);
        assert_eq!(config.integrity, IntegrityPolicy::FailJoin);
        assert_eq!(config.on_error, Continuation::Complete);
        assert_eq!(config.log_format, LogFormat::Pretty);

        let http = config.http();
        assert_eq!(http.token.as_deref(), Some("secret"));
        assert_eq!(http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = CatalogConfig::from_lookup(lookup(&[(ENV_PRICE_MARKUP, "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PRICE_MARKUP, .. }));

        let err = CatalogConfig::from_lookup(lookup(&[(ENV_ON_ERROR, "explode")])).unwrap_err();
        assert!(err.to_string().contains(ENV_ON_ERROR));
    }
}
