//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                              | Default     |
//! |---------------------------------------|-------------|
//! | `AGUA_DATABASE_PATH`                  | `./agua.db` |
//! | `AGUA_MAX_CONNECTIONS`                | `5`         |
//! | `AGUA_FALLBACK_DELIVERY_FEE_CENTS`    | `500`       |
//! | `AGUA_VOUCHER_DUE_DAYS`               | `30`        |
//! | `AGUA_DISCOUNT_TIER1_THRESHOLD_CENTS` | `5000`      |
//! | `AGUA_DISCOUNT_TIER1_BPS`             | `1000`      |
//! | `AGUA_DISCOUNT_TIER2_THRESHOLD_CENTS` | `10000`     |
//! | `AGUA_DISCOUNT_TIER2_BPS`             | `2000`      |
//!
//! `AGUA_VOUCHER_DUE_DAYS` must lie in `0..=3650`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use agua_core::delivery::{DeliveryDiscountPolicy, DeliveryFeeCalculator, DiscountThreshold};
use agua_core::{CoreError, DiscountRate, Money};
use agua_core::{DEFAULT_FALLBACK_DELIVERY_FEE_CENTS, DEFAULT_VOUCHER_DUE_DAYS};

use crate::pool::DbConfig;

/// Longest credit term a voucher can be given, in days.
pub const MAX_VOUCHER_DUE_DAYS: i64 = 3_650;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Days from a credit order to its voucher's due date
    pub voucher_due_days: i64,

    /// Delivery fee rules (discount policy + fallback fee), validated on load
    pub delivery_fees: DeliveryFeeCalculator,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, test map...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("AGUA_DATABASE_PATH").unwrap_or_else(|| "./agua.db".to_string());

        let max_connections: u32 = parse_var(&lookup, "AGUA_MAX_CONNECTIONS", 5)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("AGUA_MAX_CONNECTIONS".to_string()));
        }

        let voucher_due_days: i64 =
            parse_var(&lookup, "AGUA_VOUCHER_DUE_DAYS", DEFAULT_VOUCHER_DUE_DAYS)?;
        if !(0..=MAX_VOUCHER_DUE_DAYS).contains(&voucher_due_days) {
            return Err(ConfigError::InvalidValue("AGUA_VOUCHER_DUE_DAYS".to_string()));
        }

        let fallback_fee: i64 = parse_var(
            &lookup,
            "AGUA_FALLBACK_DELIVERY_FEE_CENTS",
            DEFAULT_FALLBACK_DELIVERY_FEE_CENTS,
        )?;

        let policy = DeliveryDiscountPolicy::new(vec![
            DiscountThreshold {
                min_subtotal: Money::from_cents(parse_var(
                    &lookup,
                    "AGUA_DISCOUNT_TIER1_THRESHOLD_CENTS",
                    5_000,
                )?),
                rate: DiscountRate::from_bps(parse_var(&lookup, "AGUA_DISCOUNT_TIER1_BPS", 1_000)?),
            },
            DiscountThreshold {
                min_subtotal: Money::from_cents(parse_var(
                    &lookup,
                    "AGUA_DISCOUNT_TIER2_THRESHOLD_CENTS",
                    10_000,
                )?),
                rate: DiscountRate::from_bps(parse_var(&lookup, "AGUA_DISCOUNT_TIER2_BPS", 2_000)?),
            },
        ])?;

        let delivery_fees = DeliveryFeeCalculator::new(policy, Money::from_cents(fallback_fee))?;

        Ok(EngineConfig {
            database_path: PathBuf::from(database_path),
            max_connections,
            voucher_due_days,
            delivery_fees,
        })
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from("./agua.db"),
            max_connections: 5,
            voucher_due_days: DEFAULT_VOUCHER_DUE_DAYS,
            delivery_fees: DeliveryFeeCalculator::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid delivery fee configuration: {0}")]
    InvalidPolicy(#[from] CoreError),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.voucher_due_days, 30);
        assert_eq!(config.delivery_fees.fallback_fee().cents(), 500);
        assert_eq!(
            config.delivery_fees.policy(),
            &DeliveryDiscountPolicy::default()
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("AGUA_DATABASE_PATH", "/tmp/agua-test.db"),
            ("AGUA_FALLBACK_DELIVERY_FEE_CENTS", "700"),
            ("AGUA_DISCOUNT_TIER2_BPS", "2500"),
        ])
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/agua-test.db"));
        assert_eq!(config.delivery_fees.fallback_fee().cents(), 700);
        assert_eq!(config.delivery_fees.policy().thresholds()[1].rate.bps(), 2500);
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_unparseable_value() {
        let err = load(&[("AGUA_VOUCHER_DUE_DAYS", "thirty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "AGUA_VOUCHER_DUE_DAYS"));
    }

    #[test]
    fn test_voucher_due_days_is_bounded() {
        assert_eq!(load(&[("AGUA_VOUCHER_DUE_DAYS", "3650")]).unwrap().voucher_due_days, 3_650);

        for raw in ["-1", "3651", "200000000"] {
            let err = load(&[("AGUA_VOUCHER_DUE_DAYS", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "AGUA_VOUCHER_DUE_DAYS"));
        }
    }

    #[test]
    fn test_unordered_policy_is_rejected() {
        let err = load(&[("AGUA_DISCOUNT_TIER1_THRESHOLD_CENTS", "20000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy(_)));
    }
}
