//! Logging configuration for ltsvq
//!
//! Diagnostics use the `tracing` framework. They go to stderr (stdout carries
//! query results) or to a daily-rolled log file. `RUST_LOG` overrides the
//! configured level.

use ltsvq_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Output to stderr
    Stderr,
    /// Output to a file with daily rotation
    File(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level filter
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::off()
    }
}

impl LogConfig {
    /// No diagnostics unless `RUST_LOG` asks for them
    pub fn off() -> Self {
        Self {
            level: "off".to_string(),
            output: LogOutput::Stderr,
            format: LogFormat::Compact,
        }
    }

    /// Debug level on stderr
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::off()
        }
    }

    /// Set log output to a file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Config(format!("invalid log level '{}': {}", self.level, e)))
    }

    /// Initialize global logging with this configuration.
    ///
    /// File output runs on a background writer; the returned guard must be
    /// kept alive until the run ends or buffered lines are lost.
    ///
    /// ```rust,no_run
    /// use ltsvq::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().init()?;
    /// # Ok::<(), ltsvq::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let env_filter = self.filter()?;
        let registry = tracing_subscriber::registry().with(env_filter);

        let (result, guard) = match self.output {
            LogOutput::Stderr => {
                let result = match self.format {
                    LogFormat::Pretty => registry
                        .with(fmt::layer().with_writer(std::io::stderr).pretty())
                        .try_init(),
                    LogFormat::Compact => registry
                        .with(fmt::layer().with_writer(std::io::stderr).compact())
                        .try_init(),
                };
                (result, None)
            }
            LogOutput::File(path) => {
                let file_appender = tracing_appender::rolling::daily(
                    path.parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or_else(|| Path::new(".")),
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("ltsvq.log"),
                );
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
                let result = match self.format {
                    LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
                    LogFormat::Compact => registry.with(layer.compact()).try_init(),
                };
                (result, Some(guard))
            }
        };

        result.map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;
        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "off");
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::debug()
            .with_file("/tmp/ltsvq.log")
            .with_format(LogFormat::Pretty);
        assert_eq!(config.level, "debug");
        assert!(matches!(config.output, LogOutput::File(_)));
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_bad_level_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = LogConfig::off().with_level("ltsvq=loud").filter().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
