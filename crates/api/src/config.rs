//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::HostedCheckoutConfig;
use thiserror::Error;

/// Development-only webhook secret used by [`Config::default`].
pub const DEV_EVENTS_SECRET: &str = "dev-events-secret";

/// Configuration errors raised at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: Postgres connection string; in-memory store when unset
/// - `STORE_TIMEOUT_MS`: bound on each storage call (default: `2000`)
/// - `GATEWAY_EVENTS_SECRET`: webhook signing secret (required)
/// - `GATEWAY_SIGNATURE_TOLERANCE_SECS`: max signature age (default: `300`)
/// - `GATEWAY_CHECKOUT_URL`, `GATEWAY_PUBLIC_KEY`, `GATEWAY_INTEGRITY_SECRET`:
///   hosted checkout; all three or none
/// - `GATEWAY_CURRENCY` (default: `"COP"`), `GATEWAY_REDIRECT_URL`
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    pub gateway_events_secret: String,
    pub signature_tolerance_secs: i64,
    /// Hosted checkout settings; gateway checkouts use an in-memory gateway
    /// when absent.
    pub hosted_checkout: Option<HostedCheckoutConfig>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let hosted_checkout = match (
            var("GATEWAY_CHECKOUT_URL"),
            var("GATEWAY_PUBLIC_KEY"),
            var("GATEWAY_INTEGRITY_SECRET"),
        ) {
            (Some(checkout_url), Some(public_key), Some(integrity_secret)) => {
                Some(HostedCheckoutConfig {
                    checkout_url,
                    public_key,
                    integrity_secret,
                    currency: var("GATEWAY_CURRENCY").unwrap_or_else(|| "COP".to_string()),
                    redirect_url: var("GATEWAY_REDIRECT_URL"),
                })
            }
            (None, None, None) => None,
            (None, _, _) => return Err(ConfigError::Missing("GATEWAY_CHECKOUT_URL")),
            (_, None, _) => return Err(ConfigError::Missing("GATEWAY_PUBLIC_KEY")),
            (_, _, None) => return Err(ConfigError::Missing("GATEWAY_INTEGRITY_SECRET")),
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", var("PORT"), defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            store_timeout: Duration::from_millis(parse_or(
                "STORE_TIMEOUT_MS",
                var("STORE_TIMEOUT_MS"),
                defaults.store_timeout.as_millis() as u64,
            )?),
            gateway_events_secret: var("GATEWAY_EVENTS_SECRET")
                .ok_or(ConfigError::Missing("GATEWAY_EVENTS_SECRET"))?,
            signature_tolerance_secs: parse_or(
                "GATEWAY_SIGNATURE_TOLERANCE_SECS",
                var("GATEWAY_SIGNATURE_TOLERANCE_SECS"),
                defaults.signature_tolerance_secs,
            )?,
            hosted_checkout,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            store_timeout: Duration::from_secs(2),
            gateway_events_secret: DEV_EVENTS_SECRET.to_string(),
            signature_tolerance_secs: webhook::signature::DEFAULT_TOLERANCE_SECS,
            hosted_checkout: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("store_timeout", &self.store_timeout)
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("hosted_checkout", &self.hosted_checkout.is_some())
            .finish_non_exhaustive()
    }
}
