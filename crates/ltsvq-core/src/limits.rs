//! Resource limits for ingestion and querying
//!
//! Bounds the size of everything that flows in from outside the process so a
//! single pathological line or query cannot exhaust memory. Each check maps
//! onto the error kind of the stage it guards, which decides whether the
//! failure is contained to one line or ends the run.

use crate::error::{Error, Result};

/// Maximum number of columns, matching SQLite's default `SQLITE_MAX_COLUMN`
pub const DEFAULT_MAX_COLUMNS: usize = 2000;

/// Maximum raw line length (16 MB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Maximum column name length
pub const DEFAULT_MAX_KEY_BYTES: usize = 1024;

/// Maximum cell value length (16 MB)
pub const DEFAULT_MAX_VALUE_BYTES: usize = 16 * 1024 * 1024;

/// Maximum query text length (1 MB)
pub const DEFAULT_MAX_QUERY_BYTES: usize = 1024 * 1024;

/// Resource limits applied by the table and the ingest driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum number of columns the schema may grow to
    pub max_columns: usize,
    /// Maximum number of rows; `None` means unbounded
    pub max_rows: Option<usize>,
    /// Maximum length of one input line in bytes
    pub max_line_bytes: usize,
    /// Maximum length of a column name in bytes
    pub max_key_bytes: usize,
    /// Maximum length of a single value in bytes
    pub max_value_bytes: usize,
    /// Maximum length of the query text in bytes
    pub max_query_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_columns: DEFAULT_MAX_COLUMNS,
            max_rows: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_key_bytes: DEFAULT_MAX_KEY_BYTES,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            max_query_bytes: DEFAULT_MAX_QUERY_BYTES,
        }
    }
}

impl ResourceLimits {
    /// Set the column limit
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    /// Set the row limit
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Set the value size limit
    pub fn with_max_value_bytes(mut self, max_value_bytes: usize) -> Self {
        self.max_value_bytes = max_value_bytes;
        self
    }

    /// Set the line size limit
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Validates that the limits themselves are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_columns == 0 {
            return Err(Error::Config("max_columns cannot be zero".to_string()));
        }

        if self.max_line_bytes == 0 {
            return Err(Error::Config("max_line_bytes cannot be zero".to_string()));
        }

        if self.max_key_bytes == 0 {
            return Err(Error::Config("max_key_bytes cannot be zero".to_string()));
        }

        if self.max_query_bytes == 0 {
            return Err(Error::Config("max_query_bytes cannot be zero".to_string()));
        }

        Ok(())
    }

    /// Validates a raw input line before parsing
    #[inline]
    pub fn check_line(&self, line: &str) -> Result<()> {
        if line.len() > self.max_line_bytes {
            return Err(Error::MalformedRecord(format!(
                "line length {} exceeds maximum {}",
                line.len(),
                self.max_line_bytes
            )));
        }
        Ok(())
    }

    /// Validates that a new column may be added to a schema of `current` columns
    #[inline]
    pub fn check_new_column(&self, name: &str, current: usize) -> Result<()> {
        if name.len() > self.max_key_bytes {
            return Err(Error::SchemaMigration {
                column: name.to_string(),
                reason: format!(
                    "column name length {} exceeds maximum {}",
                    name.len(),
                    self.max_key_bytes
                ),
            });
        }

        if current >= self.max_columns {
            return Err(Error::SchemaMigration {
                column: name.to_string(),
                reason: format!("too many columns (maximum {})", self.max_columns),
            });
        }

        Ok(())
    }

    /// Validates a cell value before it is written
    #[inline]
    pub fn check_value(&self, column: &str, value: &str) -> Result<()> {
        if value.len() > self.max_value_bytes {
            return Err(Error::Insert(format!(
                "value for '{}' is {} bytes, maximum is {}",
                column,
                value.len(),
                self.max_value_bytes
            )));
        }
        Ok(())
    }

    /// Validates that one more row fits in a table of `current` rows
    #[inline]
    pub fn check_row_count(&self, current: usize) -> Result<()> {
        match self.max_rows {
            Some(max) if current >= max => Err(Error::Insert(format!(
                "table is full (maximum {} rows)",
                max
            ))),
            _ => Ok(()),
        }
    }

    /// Validates query text
    #[inline]
    pub fn check_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::Query("Query cannot be empty".to_string()));
        }

        if query.len() > self.max_query_bytes {
            return Err(Error::Query(format!(
                "Query length {} exceeds maximum {}",
                query.len(),
                self.max_query_bytes
            )));
        }

        Ok(())
    }
}
