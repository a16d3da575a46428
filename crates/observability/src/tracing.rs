//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

use crate::LoggingConfig;

/// Build the filter: `RUST_LOG` if set and valid, else the configured
/// directive, else `info`.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call multiple times (subsequent
/// calls are no-ops).
pub fn init(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let cfg = LoggingConfig {
            filter: "debug".into(),
            json: false,
        };
        init(&cfg);
        init(&cfg);
        ::tracing::info!("still alive");
    }

    #[test]
    fn invalid_directive_falls_back() {
        let cfg = LoggingConfig {
            filter: "=[".into(),
            json: true,
        };
        let _ = filter(&cfg);
    }
}
