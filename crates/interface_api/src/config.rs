//! API configuration

use serde::Deserialize;
use std::time::Duration;

use core_kernel::{BusinessTimezone, CallPolicy};
use infra_db::DatabaseConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Connections kept by the database pool
    pub db_max_connections: u32,
    /// Wait for a free pool connection, in milliseconds
    pub db_acquire_timeout_ms: u64,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
    /// Directory that holds uploaded proof files
    pub storage_root: String,
    /// IANA timezone whose calendar decides overdue installments
    pub timezone: String,
    /// Deadline for each store call, in milliseconds
    pub call_timeout_ms: u64,
    /// Pause before the single retry of a transient failure
    pub retry_backoff_ms: u64,
    /// Largest accepted proof upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/payments".to_string(),
            db_max_connections: 10,
            db_acquire_timeout_ms: 5_000,
            log_level: "info".to_string(),
            log_json: false,
            storage_root: "./storage".to_string(),
            timezone: "America/Mexico_City".to_string(),
            call_timeout_ms: CallPolicy::default().timeout_ms,
            retry_backoff_ms: CallPolicy::default().retry_backoff_ms,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("database_url", defaults.database_url)?
            .set_default("db_max_connections", defaults.db_max_connections)?
            .set_default("db_acquire_timeout_ms", defaults.db_acquire_timeout_ms)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .set_default("storage_root", defaults.storage_root)?
            .set_default("timezone", defaults.timezone)?
            .set_default("call_timeout_ms", defaults.call_timeout_ms)?
            .set_default("retry_backoff_ms", defaults.retry_backoff_ms)?
            .set_default("max_upload_bytes", defaults.max_upload_bytes as u64)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_millis(self.db_acquire_timeout_ms))
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout_ms: self.call_timeout_ms,
            retry_backoff_ms: self.retry_backoff_ms,
        }
    }

    /// Parses the configured timezone name
    pub fn business_timezone(&self) -> Result<BusinessTimezone, config::ConfigError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map(BusinessTimezone::new)
            .map_err(|e| config::ConfigError::Message(format!("invalid timezone '{}': {}", self.timezone, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.call_policy(), CallPolicy::default());
        assert_eq!(config.business_timezone().unwrap().name(), "America/Mexico_City");
    }

    #[test]
    fn test_database_config_carries_pool_settings() {
        let config = ApiConfig {
            db_max_connections: 25,
            db_acquire_timeout_ms: 750,
            ..ApiConfig::default()
        };
        let database = config.database_config();

        assert_eq!(database.url, "postgres://localhost/payments");
        assert_eq!(database.max_connections, 25);
        assert_eq!(database.acquire_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let config = ApiConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.business_timezone().is_err());
    }
}
