//! Ledger configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                         | Default              |
//! |----------------------------------|----------------------|
//! | `COUPON_DB_PATH`                 | `./data/coupons.db`  |
//! | `COUPON_DB_MAX_CONNECTIONS`      | `5`                  |
//! | `COUPON_DB_CONNECT_TIMEOUT_SECS` | `30`                 |
//! | `COUPON_RUN_MIGRATIONS`          | `true`               |
//! | `COUPON_LOG`                     | `info`               |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use coupon_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Coupon ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_secs: u64,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,

    /// Default log filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            db_path: PathBuf::from("./data/coupons.db"),
            max_connections: 5,
            connect_timeout_secs: 30,
            run_migrations: true,
            log_filter: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            db_path: lookup("COUPON_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            max_connections: parse_or(&lookup, "COUPON_DB_MAX_CONNECTIONS", defaults.max_connections)?,

            connect_timeout_secs: parse_or(
                &lookup,
                "COUPON_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,

            run_migrations: parse_or(&lookup, "COUPON_RUN_MIGRATIONS", defaults.run_migrations)?,

            log_filter: lookup("COUPON_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("COUPON_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.db_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("COUPON_DB_PATH".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for [`coupon_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path)
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
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

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("./data/coupons.db"));
        assert_eq!(config.max_connections, 5);
        assert!(config.run_migrations);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("COUPON_DB_PATH", "/var/lib/coupons.db"),
            ("COUPON_DB_MAX_CONNECTIONS", "12"),
            ("COUPON_RUN_MIGRATIONS", "false"),
            ("COUPON_LOG", "coupon_ledger=debug"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/coupons.db"));
        assert_eq!(config.max_connections, 12);
        assert!(!config.run_migrations);
        assert_eq!(config.log_filter, "coupon_ledger=debug");

        let db = config.db_config();
        assert_eq!(db.max_connections, 12);
        assert!(!db.run_migrations);
    }

    #[test]
    fn test_invalid_values() {
        assert_matches!(
            LedgerConfig::from_lookup(lookup(&[("COUPON_DB_MAX_CONNECTIONS", "many")])),
            Err(ConfigError::InvalidValue(key)) if key == "COUPON_DB_MAX_CONNECTIONS"
        );
        assert_matches!(
            LedgerConfig::from_lookup(lookup(&[("COUPON_DB_MAX_CONNECTIONS", "0")])),
            Err(ConfigError::InvalidValue(_))
        );
        assert_matches!(
            LedgerConfig::from_lookup(lookup(&[("COUPON_DB_PATH", "")])),
            Err(ConfigError::MissingRequired(_))
        );
    }
}
