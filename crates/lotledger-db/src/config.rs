//! # Ledger Configuration
//!
//! Settings for the database and the ledger, built once at startup and
//! passed by reference.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     LOTLEDGER_DATABASE_PATH=/var/lib/lotledger/ledger.db                │
//! │     LOTLEDGER_INVOICE_PREFIX=PH                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/lotledger/lotledger.toml (Linux)                          │
//! │     ~/Library/Application Support/com.lotledger.lotledger/... (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     ./lotledger.db, prefix "INV", April fiscal year, 3 retries          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/lotledger/ledger.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! invoice_prefix = "INV"
//! fiscal_year_start_month = 4
//! tax_mode = "inclusive"   # inclusive | exclusive
//! max_retries = 3
//! ```

use lotledger_core::{TaxMode, DEFAULT_INVOICE_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Retry bounds accepted for `ledger.max_retries`.
pub const MAX_RETRIES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Wait for a pooled connection (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long SQLite waits on a locked database before giving up (ms).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("lotledger.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// `[ledger]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Prefix of every bill number.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,

    /// First month of the fiscal year (4 = April).
    #[serde(default = "default_fiscal_year_start_month")]
    pub fiscal_year_start_month: u32,

    /// Whether sale prices include GST.
    #[serde(default)]
    pub tax_mode: TaxMode,

    /// Attempts for an operation that keeps hitting retryable conflicts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_invoice_prefix() -> String {
    DEFAULT_INVOICE_PREFIX.to_string()
}
fn default_fiscal_year_start_month() -> u32 {
    4
}
fn default_max_retries() -> u32 {
    3
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            invoice_prefix: default_invoice_prefix(),
            fiscal_year_start_month: default_fiscal_year_start_month(),
            tax_mode: TaxMode::default(),
            max_retries: default_max_retries(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`lotledger.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| DbError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        let prefix = &self.ledger.invoice_prefix;
        if prefix.is_empty()
            || prefix.len() > 10
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DbError::Config(format!(
                "invoice_prefix must be 1-10 letters or digits, got '{}'",
                prefix
            )));
        }

        if !(1..=12).contains(&self.ledger.fiscal_year_start_month) {
            return Err(DbError::Config(
                "fiscal_year_start_month must be between 1 and 12".into(),
            ));
        }

        if !MAX_RETRIES_RANGE.contains(&self.ledger.max_retries) {
            return Err(DbError::Config(format!(
                "max_retries must be between {} and {}",
                MAX_RETRIES_RANGE.start(),
                MAX_RETRIES_RANGE.end()
            )));
        }

        if self.database.max_connections == 0
            || self.database.min_connections > self.database.max_connections
        {
            return Err(DbError::Config(
                "need 0 < min_connections <= max_connections".into(),
            ));
        }

        Ok(())
    }

    /// Applies `LOTLEDGER_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("LOTLEDGER_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("LOTLEDGER_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric LOTLEDGER_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("LOTLEDGER_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring non-numeric LOTLEDGER_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = lookup("LOTLEDGER_INVOICE_PREFIX") {
            self.ledger.invoice_prefix = prefix;
        }

        if let Some(month) = lookup("LOTLEDGER_FY_START_MONTH") {
            match month.parse::<u32>() {
                Ok(m) => self.ledger.fiscal_year_start_month = m,
                Err(_) => warn!(value = %month, "Ignoring non-numeric LOTLEDGER_FY_START_MONTH"),
            }
        }

        if let Some(mode) = lookup("LOTLEDGER_TAX_MODE") {
            match mode.to_lowercase().as_str() {
                "inclusive" => self.ledger.tax_mode = TaxMode::Inclusive,
                "exclusive" => self.ledger.tax_mode = TaxMode::Exclusive,
                _ => warn!(mode = %mode, "Unknown tax mode in environment"),
            }
        }

        if let Some(retries) = lookup("LOTLEDGER_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.ledger.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring non-numeric LOTLEDGER_MAX_RETRIES"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "lotledger", "lotledger")
            .map(|dirs| dirs.config_dir().join("lotledger.toml"))
    }

    /// Pool settings derived from `[database]`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.ledger.invoice_prefix, "INV");
        assert_eq!(config.ledger.fiscal_year_start_month, 4);
        assert_eq!(config.ledger.max_retries, 3);
        assert_eq!(config.ledger.tax_mode, TaxMode::Inclusive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LedgerConfig::from_toml(
            r#"
            [ledger]
            invoice_prefix = "PH"
            tax_mode = "exclusive"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.invoice_prefix, "PH");
        assert_eq!(config.ledger.tax_mode, TaxMode::Exclusive);
        assert_eq!(config.ledger.max_retries, 3);
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.ledger.max_retries = 0;
        assert!(config.validate().is_err());
        config.ledger.max_retries = 11;
        assert!(config.validate().is_err());
        config.ledger.max_retries = 10;
        assert!(config.validate().is_ok());

        config.ledger.invoice_prefix = "IN V".into();
        assert!(config.validate().is_err());
        config.ledger.invoice_prefix = "INV".into();

        config.ledger.fiscal_year_start_month = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("LOTLEDGER_DATABASE_PATH", "/tmp/ledger.db"),
            ("LOTLEDGER_MAX_RETRIES", "5"),
            ("LOTLEDGER_TAX_MODE", "EXCLUSIVE"),
            ("LOTLEDGER_FY_START_MONTH", "not-a-month"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.ledger.max_retries, 5);
        assert_eq!(config.ledger.tax_mode, TaxMode::Exclusive);
        assert_eq!(config.ledger.fiscal_year_start_month, 4);
    }

    #[test]
    fn test_db_config_carries_timeouts() {
        let mut config = LedgerConfig::default();
        config.database.busy_timeout_ms = 250;
        let db = config.db_config();
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
        assert_eq!(db.max_connections, 5);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&LedgerConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[ledger]"));
    }
}
