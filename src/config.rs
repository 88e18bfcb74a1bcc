//! Service configuration loaded from environment variables (and `.env`).

use std::time::Duration;

use thiserror::Error;

use crate::db::PoolSettings;
use crate::domain::transition::{TrackingNumberGenerator, TransitionPolicy, TransitionRules};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Reads:
/// - `DATABASE_URL` (required)
/// - `HOST` (default `0.0.0.0`), `PORT` (default `8080`)
/// - `DB_POOL_MAX_SIZE` (default `20`), `DB_CONNECT_TIMEOUT_MS` (default `2000`)
/// - `PAYMENT_CURRENCY` (default `thb`)
/// - `TRACKING_PREFIX` (default `TH`)
/// - `ORDER_TRANSITION_POLICY`, `permissive` or `forward` (default `permissive`)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool: PoolSettings,
    pub currency: String,
    pub tracking: TrackingNumberGenerator,
    pub transition_policy: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let max_size = parse_or(&lookup, "DB_POOL_MAX_SIZE", 20u32)?;
        if max_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_POOL_MAX_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }
        let timeout_ms = parse_or(&lookup, "DB_CONNECT_TIMEOUT_MS", 2000u64)?;

        let tracking = TrackingNumberGenerator::new(
            &lookup("TRACKING_PREFIX").unwrap_or_else(|| "TH".to_string()),
        )
        .map_err(|reason| ConfigError::Invalid {
            name: "TRACKING_PREFIX",
            reason,
        })?;
        let transition_policy =
            parse_or(&lookup, "ORDER_TRANSITION_POLICY", TransitionPolicy::Permissive)?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            pool: PoolSettings {
                max_size,
                connection_timeout: Duration::from_millis(timeout_ms),
            },
            currency: lookup("PAYMENT_CURRENCY")
                .unwrap_or_else(|| "thb".to_string())
                .to_ascii_lowercase(),
            tracking,
            transition_policy,
        })
    }

    pub fn transition_rules(&self) -> TransitionRules {
        TransitionRules {
            policy: self.transition_policy,
            tracking: self.tracking.clone(),
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.pool, PoolSettings::default());
        assert_eq!(config.currency, "thb");
        assert_eq!(config.tracking.prefix(), "TH");
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PORT", "3000"),
            ("DB_POOL_MAX_SIZE", "5"),
            ("DB_CONNECT_TIMEOUT_MS", "250"),
            ("PAYMENT_CURRENCY", "USD"),
            ("TRACKING_PREFIX", "us"),
            ("ORDER_TRANSITION_POLICY", "forward"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.pool.max_size, 5);
        assert_eq!(config.pool.connection_timeout, Duration::from_millis(250));
        assert_eq!(config.currency, "usd");
        assert_eq!(config.transition_rules().tracking.prefix(), "US");
        assert_eq!(config.transition_rules().policy, TransitionPolicy::Forward);
    }

    #[test]
    fn bad_values_are_reported_by_name() {
        let err = config(&[("DATABASE_URL", "x"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = config(&[("DATABASE_URL", "x"), ("TRACKING_PREFIX", "THA")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "TRACKING_PREFIX",
                ..
            }
        ));

        let err = config(&[("DATABASE_URL", "x"), ("DB_POOL_MAX_SIZE", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "DB_POOL_MAX_SIZE",
                ..
            }
        ));
    }
}
