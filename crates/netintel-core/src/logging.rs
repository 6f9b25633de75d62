//! Logging initialization

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global tracing subscriber based on the logging configuration
///
/// `RUST_LOG` overrides the configured level. Fails if a global subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::config_value("logging.level", e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json_format {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::Config(format!("failed to install logger: {e}")))
}

