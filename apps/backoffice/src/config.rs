//! # Back-office Configuration
//!
//! Loaded once at startup from the environment.
//!
//! ## Environment Variables
//! | Variable                      | Default                          |
//! |-------------------------------|----------------------------------|
//! | `STOCKBOOK_DB_PATH`           | `<data dir>/stockbook.db`        |
//! | `STOCKBOOK_MAX_CONNECTIONS`   | `5`                              |
//! | `STOCKBOOK_BUSY_TIMEOUT_SECS` | `5`                              |
//! | `STOCKBOOK_BCV_RATE`          | unset (provider unavailable)     |
//! | `STOCKBOOK_FALLBACK_RATE`     | `36.0`                           |
//!
//! The data dir is the platform application data directory
//! (`~/.local/share/stockbook` on Linux); `./stockbook.db` is used when
//! none can be determined.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use stockbook_core::ExchangeRate;
use stockbook_db::DbConfig;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FALLBACK_RATE: f64 = 36.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Could not create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BackofficeConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Rate served by the static provider; `None` makes it unavailable.
    pub bcv_rate: Option<ExchangeRate>,
    /// Rate reported when the provider fails.
    pub fallback_rate: ExchangeRate,
}

impl BackofficeConfig {
    /// Reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("STOCKBOOK_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_database_path()?,
        };

        let max_connections = match lookup("STOCKBOOK_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    var: "STOCKBOOK_MAX_CONNECTIONS",
                    expected: "a positive integer",
                    value,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let busy_timeout_secs = match lookup("STOCKBOOK_BUSY_TIMEOUT_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                var: "STOCKBOOK_BUSY_TIMEOUT_SECS",
                expected: "a whole number of seconds",
                value,
            })?,
            None => DEFAULT_BUSY_TIMEOUT_SECS,
        };

        let bcv_rate = lookup("STOCKBOOK_BCV_RATE")
            .map(|value| parse_rate("STOCKBOOK_BCV_RATE", value))
            .transpose()?;

        let fallback_rate = match lookup("STOCKBOOK_FALLBACK_RATE") {
            Some(value) => parse_rate("STOCKBOOK_FALLBACK_RATE", value)?,
            None => ExchangeRate::from_f64(DEFAULT_FALLBACK_RATE).ok_or(ConfigError::Invalid {
                var: "STOCKBOOK_FALLBACK_RATE",
                expected: "a positive number",
                value: DEFAULT_FALLBACK_RATE.to_string(),
            })?,
        };

        Ok(BackofficeConfig {
            database_path,
            max_connections,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
            bcv_rate,
            fallback_rate,
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(self.busy_timeout)
    }
}

fn parse_rate(var: &'static str, value: String) -> Result<ExchangeRate, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(ExchangeRate::from_f64)
        .ok_or(ConfigError::Invalid {
            var,
            expected: "a positive number",
            value,
        })
}

fn default_database_path() -> Result<PathBuf, ConfigError> {
    match ProjectDirs::from("com", "stockbook", "stockbook") {
        Some(dirs) => {
            let data_dir = dirs.data_dir();
            std::fs::create_dir_all(data_dir)?;
            Ok(data_dir.join("stockbook.db"))
        }
        None => Ok(PathBuf::from("./stockbook.db")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BackofficeConfig::from_lookup(lookup(&[("STOCKBOOK_DB_PATH", "/tmp/x.db")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.bcv_rate.is_none());
        assert_eq!(config.fallback_rate.scaled(), 360_000);
    }

    #[test]
    fn test_overrides() {
        let config = BackofficeConfig::from_lookup(lookup(&[
            ("STOCKBOOK_DB_PATH", "/tmp/x.db"),
            ("STOCKBOOK_MAX_CONNECTIONS", "8"),
            ("STOCKBOOK_BUSY_TIMEOUT_SECS", "2"),
            ("STOCKBOOK_BCV_RATE", "36.5432"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout, Duration::from_secs(2));
        assert_eq!(config.bcv_rate.map(|r| r.scaled()), Some(365_432));
        assert_eq!(config.db_config().max_connections, 8);
    }

    #[test]
    fn test_invalid_values() {
        let err = BackofficeConfig::from_lookup(lookup(&[
            ("STOCKBOOK_DB_PATH", "/tmp/x.db"),
            ("STOCKBOOK_MAX_CONNECTIONS", "zero"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STOCKBOOK_MAX_CONNECTIONS"));

        let err = BackofficeConfig::from_lookup(lookup(&[
            ("STOCKBOOK_DB_PATH", "/tmp/x.db"),
            ("STOCKBOOK_FALLBACK_RATE", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
