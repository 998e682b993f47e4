//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ProvisionError;

/// Level used when `-v` is given.
pub const VERBOSE_LEVEL: &str = "debug";

/// Pick the filter directive: `RUST_LOG` wins, then `-v`, then the config.
fn filter_for(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(VERBOSE_LEVEL)
        } else {
            EnvFilter::new(&config.level)
        }
    })
}

/// Install the global subscriber. Logs go to stderr; stdout is kept for
/// user-facing output.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<(), ProvisionError> {
    let env_filter = filter_for(config, verbose);

    let result = match config.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| ProvisionError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })
}
