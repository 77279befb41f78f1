//! Error types for ltsvq.

use thiserror::Error;

/// The main error type for ltsvq operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An input line could not be split into key/value pairs
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A new column could not be added to the relation
    #[error("Schema migration failed for column '{column}': {reason}")]
    SchemaMigration {
        /// Column that was being added
        column: String,
        /// Why the column was rejected
        reason: String,
    },

    /// A row write failed after the schema was migrated
    #[error("Insert failed: {0}")]
    Insert(String),

    /// The query could not be parsed, planned or executed
    #[error("Query error: {0}")]
    Query(String),

    /// Writing the result failed
    #[error("Output error: {0}")]
    Output(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for failures that are contained to a single input line.
    ///
    /// Ingestion skips the offending line and continues; every other kind
    /// ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedRecord(_) | Error::SchemaMigration { .. } | Error::Insert(_)
        )
    }
}

/// A specialized `Result` type for ltsvq operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_line_errors_are_recoverable() {
        assert!(Error::MalformedRecord("x".into()).is_recoverable());
        assert!(Error::SchemaMigration {
            column: "a".into(),
            reason: "duplicate".into()
        }
        .is_recoverable());
        assert!(Error::Insert("x".into()).is_recoverable());
    }

    #[test]
    fn test_post_ingest_errors_are_fatal() {
        assert!(!Error::Query("x".into()).is_recoverable());
        assert!(!Error::Output("x".into()).is_recoverable());
        assert!(!Error::Config("x".into()).is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(!Error::from(io).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = Error::SchemaMigration {
            column: "host".into(),
            reason: "column already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "Schema migration failed for column 'host': column already exists"
        );
    }
}
