//! Run configuration

use crate::logging::LogConfig;
use ltsvq_core::{
    Delimiters, Error, MissingColumnPolicy, ResourceLimits, Result, DEFAULT_TABLE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one `ltsvq` run needs
#[derive(Debug, Clone)]
pub struct Config {
    /// Query text
    pub query: String,
    /// Input file; stdin when `None`
    pub input: Option<PathBuf>,
    /// Output file, created or truncated; stdout when `None`
    pub output: Option<PathBuf>,
    /// Relation name the query selects from
    pub table: String,
    /// Delimiters for both input and output
    pub delimiters: Delimiters,
    /// Formatter policy for rows lacking an output column
    pub missing_columns: MissingColumnPolicy,
    /// Resource limits
    pub limits: ResourceLimits,
    /// Diagnostics
    pub log: LogConfig,
}

impl Config {
    /// Configuration with defaults for everything but the query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            input: None,
            output: None,
            table: DEFAULT_TABLE_NAME.to_string(),
            delimiters: Delimiters::default(),
            missing_columns: MissingColumnPolicy::default(),
            limits: ResourceLimits::default(),
            log: LogConfig::default(),
        }
    }

    /// Configuration whose query is read from a file
    pub fn from_query_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let query = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read query file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(query))
    }

    /// Read input from a file instead of stdin
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Write output to a file instead of stdout
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Relation name the query selects from
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Field and key/value separators for input and output
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Policy for rows lacking an output column
    pub fn with_missing_columns(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_columns = policy;
        self
    }

    /// Replace the resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Shorthand for the column limit alone
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.limits = self.limits.with_max_columns(max_columns);
        self
    }

    /// Logging configuration
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Check the configuration before any input is read
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::Config("no query given".to_string()));
        }

        if self.table.is_empty()
            || !self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!(
                "table name '{}' must be a plain identifier",
                self.table
            )));
        }

        self.limits.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltsvq_core::limits::DEFAULT_MAX_COLUMNS;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::new("SELECT * FROM ltsv");
        assert_eq!(config.table, "ltsv");
        assert_eq!(config.delimiters, Delimiters::default());
        assert_eq!(config.missing_columns, MissingColumnPolicy::Error);
        assert_eq!(config.limits.max_columns, DEFAULT_MAX_COLUMNS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_query() {
        assert!(matches!(Config::default().validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_table_name() {
        let config = Config::new("SELECT 1").with_table("my table");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_columns_rejected() {
        let config = Config::new("SELECT * FROM ltsv").with_max_columns(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_query_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SELECT a FROM ltsv").unwrap();

        let config = Config::from_query_file(file.path()).unwrap();
        assert_eq!(config.query.trim(), "SELECT a FROM ltsv");

        let missing = Config::from_query_file("/nonexistent/query.sql");
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
