//! Configuration loaded from `ontoloom.toml`.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Command-line flags override file values.
//!
//! ```toml
//! # Schema resource to load at start
//! schema = "network.xml"
//!
//! [blobs]
//! dir = "./blobs"
//!
//! [store]
//! file = "./graph.msgpack"
//!
//! [retry]
//! max_attempts = 3
//! backoff_ms = 50
//!
//! [log]
//! filter = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ontoloom_foundation::{Error, ErrorKind, Result};
use ontoloom_graph::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "ontoloom.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OntoloomConfig {
    /// Schema resource name to load at start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Blob store settings.
    pub blobs: BlobConfig,
    /// Graph store settings.
    pub store: StoreConfig,
    /// Retry policy for transient store failures.
    pub retry: RetryConfig,
    /// Logging settings.
    pub log: LogConfig,
}

/// `[blobs]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlobConfig {
    /// Directory holding schema documents and generated artifacts.
    pub dir: PathBuf,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

/// `[store]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Snapshot file for the in-memory graph store; none keeps it in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// `[retry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per store call.
    pub max_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_ms: u64::try_from(policy.backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl RetryConfig {
    /// The policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `ontoloom_storage=debug`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            json: false,
        }
    }
}

impl OntoloomConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the problem.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::new(ErrorKind::ConfigError(e.to_string())))
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::new(ErrorKind::IoError(format!(
                "failed to read config file '{}': {e}",
                path.display()
            )))
        })?;
        Self::from_toml(&text).map_err(|e| {
            Error::new(ErrorKind::ConfigError(format!(
                "failed to parse config file '{}': {e}",
                path.display()
            )))
        })
    }

    /// Reads `path` if given, else `ontoloom.toml` in the working directory
    /// if it exists, else the defaults.
    ///
    /// # Errors
    ///
    /// See [`from_file`](Self::from_file).
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
