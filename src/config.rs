//! Configuration for the ledger

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Error;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name, used in log lines
    pub service_name: String,

    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,

    /// Ledger engine configuration
    pub ledger: LedgerConfig,

    /// Read-side configuration
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "wallet-ledger".to_string(),
            log_filter: "info".to_string(),
            ledger: LedgerConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

/// Ledger engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Prefix of wallet transaction references
    pub transaction_prefix: String,

    /// Prefix of booking references
    pub booking_prefix: String,

    /// Digits of the daily sequence
    pub sequence_width: usize,

    /// Longest wait for another movement on the same account
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_prefix: "TXN".to_string(),
            booking_prefix: "HTB".to_string(),
            sequence_width: 4,
            lock_timeout_ms: 500,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Read-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size when the caller gives none
    pub default_limit: u32,

    /// Larger page sizes are clamped to this
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl Config {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();

        if let Ok(prefix) = std::env::var("WALLET_LEDGER_TXN_PREFIX") {
            config.ledger.transaction_prefix = prefix;
        }

        if let Ok(prefix) = std::env::var("WALLET_LEDGER_BOOKING_PREFIX") {
            config.ledger.booking_prefix = prefix;
        }

        if let Ok(width) = std::env::var("WALLET_LEDGER_SEQUENCE_WIDTH") {
            config.ledger.sequence_width = width
                .parse()
                .map_err(|_| Error::Config(format!("Invalid sequence width: {}", width)))?;
        }

        if let Ok(timeout) = std::env::var("WALLET_LEDGER_LOCK_TIMEOUT_MS") {
            config.ledger.lock_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::Config(format!("Invalid lock timeout: {}", timeout)))?;
        }

        if let Ok(filter) = std::env::var("WALLET_LEDGER_LOG") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, prefix) in [
            ("transaction_prefix", &self.ledger.transaction_prefix),
            ("booking_prefix", &self.ledger.booking_prefix),
        ] {
            // a digit in the prefix would blur where the date starts
            if prefix.is_empty() || prefix.chars().any(|c| c.is_ascii_digit()) {
                return Err(Error::Config(format!(
                    "{} must be non-empty and free of digits, got {:?}",
                    name, prefix
                )));
            }
        }

        if !(1..=9).contains(&self.ledger.sequence_width) {
            return Err(Error::Config(format!(
                "sequence_width must be between 1 and 9, got {}",
                self.ledger.sequence_width
            )));
        }

        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(Error::Config(format!(
                "default_limit {} must be between 1 and max_limit {}",
                self.query.default_limit, self.query.max_limit
            )));
        }

        Ok(())
    }
}
