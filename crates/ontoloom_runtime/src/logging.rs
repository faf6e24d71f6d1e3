//! Log output setup for the binary.
//!
//! Libraries only emit `tracing` events; installing a subscriber is the
//! binary's job. `ONTOLOOM_LOG` overrides the configured filter.

use ontoloom_foundation::{Error, ErrorKind, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "ONTOLOOM_LOG";

/// The filter to use: `ONTOLOOM_LOG` if set and valid, else the configured one.
///
/// # Errors
///
/// Returns a configuration error if the configured directive is invalid.
pub fn filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| Error::new(ErrorKind::ConfigError(format!("invalid log filter {:?}: {e}", config.filter))))
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
///
/// Returns a configuration error if the filter is invalid or a subscriber
/// is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::new(ErrorKind::ConfigError(e.to_string())))
}
