//! Feedhook configuration
//!
//! TOML-based configuration loading with sensible defaults; a minimal
//! config should just work. All sections are optional.
//!
//! # Example
//!
//! ```toml
//! [listener]
//! address = "0.0.0.0"
//! port = 8040
//! queue_capacity = 5000
//!
//! [delivery]
//! max_attempts = 3
//! retry_interval = "1s"
//! holdoff = "10s"
//! max_failures = 3
//! ```
//!
//! # Parsing
//!
//! ```
//! use feedhook_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[listener]\nport = 9040").unwrap();
//! assert_eq!(config.listener.port, 9040);
//! ```

mod error;

pub use error::{ConfigError, Result};

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ingestion listener settings
    pub listener: ListenerConfig,

    /// Outbound delivery and health policy
    pub delivery: DeliveryConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the broker cannot run with
    fn validate(&self) -> Result<()> {
        if self.listener.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "listener.queue_capacity",
                reason: "must be at least 1",
            });
        }
        if self.delivery.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery.max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.delivery.max_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery.max_failures",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Ingestion listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Capacity of the shared event queue; pushes block when full
    pub queue_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 8040,
            queue_capacity: 5000,
        }
    }
}

impl ListenerConfig {
    /// The socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Outbound delivery and subscription health policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Attempts per delivery call before it counts as one failure
    pub max_attempts: u32,

    /// Fixed sleep between attempts within one call
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,

    /// Wait before re-attempting a failed payload at the queue head
    #[serde(with = "humantime_serde")]
    pub holdoff: Duration,

    /// Consecutive failed calls before the subscription is suspended
    pub max_failures: u32,

    /// Per-request timeout for delivery POSTs
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_interval: Duration::from_secs(1),
            holdoff: Duration::from_secs(10),
            max_failures: 3,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.listener.bind_address(), "127.0.0.1:8040");
        assert_eq!(config.listener.queue_capacity, 5000);
        assert_eq!(config.delivery.max_attempts, 3);
        assert_eq!(config.delivery.retry_interval, Duration::from_secs(1));
        assert_eq!(config.delivery.holdoff, Duration::from_secs(10));
        assert_eq!(config.delivery.max_failures, 3);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_str(
            r#"
            [listener]
            address = "0.0.0.0"
            port = 9050

            [delivery]
            retry_interval = "250ms"
            max_failures = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address(), "0.0.0.0:9050");
        assert_eq!(config.delivery.retry_interval, Duration::from_millis(250));
        assert_eq!(config.delivery.max_failures, 5);
        // Untouched fields keep defaults
        assert_eq!(config.delivery.max_attempts, 3);
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let err = Config::from_str("[listener]\nqueue_capacity = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "listener.queue_capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = Config::from_str("[delivery]\nmax_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_str("[listener\nport = 1").is_err());
    }
}
