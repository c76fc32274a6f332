//! `tracing` subscriber setup.
//!
//! Logs always go to stderr: stdout belongs to the scripts being run.
//!
//! ```no_run
//! use classloader::logging::{init, LogConfig};
//!
//! // `RUST_LOG` wins unless debug is forced.
//! init(LogConfig::cli(false)).ok();
//! ```

use std::io::IsTerminal;

use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Force debug-level logging, ignoring `RUST_LOG`.
    pub debug: bool,
    /// Level used when `RUST_LOG` is not set.
    pub default_level: String,
    /// Show the module target in each line.
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            default_level: "warn".to_string(),
            show_target: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    /// Command-line defaults: quiet unless something goes wrong.
    pub fn cli(debug: bool) -> Self {
        Self::new().debug(debug)
    }

    pub fn test() -> Self {
        Self::new().default_level("debug").show_target(true)
    }

    fn build_filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: LogConfig) -> Result<(), InitError> {
    fmt()
        .with_env_filter(config.build_filter())
        .with_target(config.show_target)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
}
