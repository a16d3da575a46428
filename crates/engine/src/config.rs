//! Engine configuration.
//!
//! Loaded in layers:
//! 1. Defaults in code
//! 2. `config/{environment}.toml`, if present
//! 3. Environment variables prefixed `LOTKEEPER`, `__` between sections
//!    (e.g. `LOTKEEPER__SYNC__BASE_URL`)

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use lotkeeper_observability::LoggingConfig;
use lotkeeper_sync::{PullOptions, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Current environment (development, production).
    pub environment: String,
    pub currency: CurrencyConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
    /// Bookkeeping currency (ISO 4217).
    pub ledger: String,
    /// Currency cross-border sales are negotiated in.
    pub settlement: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub page_size: u32,
    pub page_delay_ms: u64,
    #[serde(default)]
    pub max_pages: Option<u32>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot of lots, ledger events and sync activity.
    pub snapshot_path: PathBuf,
}

impl EngineConfig {
    /// Load configuration from files and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("LOTKEEPER_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self::load_for(&environment)
    }

    pub fn load_for(environment: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .set_default("environment", environment)?
            .set_default("currency.ledger", "JPY")?
            .set_default("currency.settlement", "USD")?
            .set_default("sync.base_url", "http://localhost:8080/api")?
            .set_default("sync.max_attempts", 4)?
            .set_default("sync.base_delay_ms", 500)?
            .set_default("sync.max_delay_ms", 8_000)?
            .set_default("sync.page_size", 100)?
            .set_default("sync.page_delay_ms", 250)?
            .set_default("sync.request_timeout_ms", 10_000)?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", true)?
            .set_default("storage.snapshot_path", "data/lotkeeper.json")?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("LOTKEEPER").separator("__").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms)),
        }
    }

    pub fn pull_options(&self) -> PullOptions {
        PullOptions {
            page_size: self.page_size.max(1),
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_pages: self.max_pages,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
