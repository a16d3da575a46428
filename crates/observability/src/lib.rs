//! Process-wide tracing setup.

use serde::Deserialize;

/// Tracing configuration (filters, output format).
pub mod tracing;

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    /// Structured JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: true,
        }
    }
}

/// Initialize tracing with defaults (JSON, `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LoggingConfig::default());
}

/// Initialize tracing from configuration.
pub fn init_with(config: &LoggingConfig) {
    tracing::init(config);
}
