//! Column set of the relation
//!
//! The schema only ever grows. Columns keep the order in which their names
//! were first observed, which is also the order `SELECT *` returns them in.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Ordered, unique set of column names
#[derive(Debug, Clone, Default)]
pub struct Schema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new column and return its position.
    ///
    /// Adding a name that is already present is a migration error; callers
    /// check [`Schema::contains`] first.
    pub fn add_column(&mut self, name: &str) -> Result<usize> {
        if self.positions.contains_key(name) {
            return Err(Error::SchemaMigration {
                column: name.to_string(),
                reason: "column already exists".to_string(),
            });
        }

        let position = self.names.len();
        self.names.push(name.to_string());
        self.positions.insert(name.to_string(), position);
        Ok(position)
    }

    /// Returns `true` if `name` is a known column
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Position of `name` in column order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Column names in creation order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no column has been added yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_columns_in_order() {
        let mut schema = Schema::new();
        assert!(schema.is_empty());

        assert_eq!(schema.add_column("host").unwrap(), 0);
        assert_eq!(schema.add_column("status").unwrap(), 1);

        assert_eq!(schema.names(), &["host".to_string(), "status".to_string()]);
        assert_eq!(schema.position("status"), Some(1));
        assert!(schema.contains("host"));
        assert!(!schema.contains("size"));
    }

    #[test]
    fn test_duplicate_add_fails() {
        let mut schema = Schema::new();
        schema.add_column("host").unwrap();

        let err = schema.add_column("host").unwrap_err();
        assert!(matches!(err, Error::SchemaMigration { ref column, .. } if column == "host"));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut schema = Schema::new();
        schema.add_column("Host").unwrap();
        schema.add_column("host").unwrap();
        assert_eq!(schema.len(), 2);
    }
}
