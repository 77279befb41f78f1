//! Dynamic-schema ingestion store
//!
//! [`LtsvTable`] is a single relation whose column set grows as records with
//! new keys arrive. Storage is sparse and columnar: each column keeps only the
//! cells rows actually set, so a row lacking a key reads back as null rather
//! than as an empty string.

use crate::error::Result;
use crate::limits::ResourceLimits;
use crate::query::{self, Column, ExecutionContext, Executor, ResultSet, Value};
use crate::record::{parse_record, Delimiters, Record};
use crate::schema::Schema;
use std::collections::BTreeMap;
use tracing::debug;

/// Default relation name queries select from
pub const DEFAULT_TABLE_NAME: &str = "ltsv";

/// Name of the hidden row-number column
pub const ROWID_COLUMN: &str = "rowid";

/// Zero-based position of a row in insertion order
pub type RowId = usize;

/// A relation with an append-only, monotonically growing column set
#[derive(Debug, Clone)]
pub struct LtsvTable {
    name: String,
    schema: Schema,
    /// One sparse cell map per schema column, in schema order
    cells: Vec<BTreeMap<RowId, String>>,
    row_count: usize,
    limits: ResourceLimits,
}

impl LtsvTable {
    /// Creates an empty table named `ltsv` with default limits
    pub fn new() -> Self {
        Self::with_name(DEFAULT_TABLE_NAME)
    }

    /// Creates an empty table with a custom relation name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(),
            cells: Vec::new(),
            row_count: 0,
            limits: ResourceLimits::default(),
        }
    }

    /// Replace the resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Relation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Known columns in the order they were first seen
    pub fn columns(&self) -> &[String] {
        self.schema.names()
    }

    /// Resource limits in effect
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Number of committed rows
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Returns `true` if no row has been committed
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Insert one record.
    ///
    /// Unknown keys become new columns before the row is written. If the
    /// write itself is then rejected, the new columns stay and no cell of
    /// the row is stored.
    pub fn insert(&mut self, record: &Record) -> Result<RowId> {
        for key in record.keys() {
            if !self.schema.contains(key) {
                self.add_column(key)?;
            }
        }

        self.limits.check_row_count(self.row_count)?;
        for (key, value) in record.iter() {
            self.limits.check_value(key, value)?;
        }

        let row_id = self.row_count;
        for (key, value) in record.iter() {
            if let Some(position) = self.schema.position(key) {
                self.cells[position].insert(row_id, value.to_string());
            }
        }
        self.row_count += 1;

        Ok(row_id)
    }

    /// Parse and insert one raw line
    pub fn insert_line(&mut self, line: &str, delimiters: Delimiters) -> Result<RowId> {
        self.limits.check_line(line)?;
        let record = parse_record(line, delimiters)?;
        self.insert(&record)
    }

    fn add_column(&mut self, name: &str) -> Result<()> {
        self.limits.check_new_column(name, self.schema.len())?;

        // Storage first, then the known-column set
        self.cells.push(BTreeMap::new());
        if let Err(err) = self.schema.add_column(name) {
            self.cells.pop();
            return Err(err);
        }

        debug!(
            table = %self.name,
            column = name,
            columns = self.schema.len(),
            "Added column"
        );
        Ok(())
    }

    /// Value stored for `column` in `row`; `None` if the row never set it
    pub fn get(&self, row: RowId, column: &str) -> Option<&str> {
        let position = self.schema.position(column)?;
        self.cells[position].get(&row).map(String::as_str)
    }

    /// The pairs stored for `row`, in column order
    pub fn row(&self, row: RowId) -> Option<Record> {
        if row >= self.row_count {
            return None;
        }

        Some(
            self.schema
                .names()
                .iter()
                .zip(&self.cells)
                .filter_map(|(name, cells)| cells.get(&row).map(|value| (name.as_str(), value.as_str())))
                .collect(),
        )
    }

    /// Materialize the relation for the query engine, `rowid` included
    pub fn to_result_set(&self) -> ResultSet {
        let mut columns: Vec<Column> = self.schema.names().iter().map(Column::new).collect();
        columns.push(Column::hidden(ROWID_COLUMN));

        let mut set = ResultSet::new(columns);
        set.rows = (0..self.row_count)
            .map(|row| {
                let mut values: Vec<Value> = self
                    .cells
                    .iter()
                    .map(|cells| match cells.get(&row) {
                        Some(value) => Value::Text(value.clone()),
                        None => Value::Null,
                    })
                    .collect();
                values.push(Value::Integer(row as i64 + 1));
                values
            })
            .collect();
        set
    }

    /// Run one query against the current contents
    pub fn query(&self, sql: &str) -> Result<Vec<ResultRow>> {
        self.limits.check_query(sql)?;
        let plan = query::prepare(sql)?;

        let context = ExecutionContext::new().with_table(&self.name, self.to_result_set());
        let result = Executor::new(context).execute(&plan)?;

        debug!(rows = result.len(), columns = result.columns.len(), "Query executed");
        Ok(ResultRow::from_result_set(result))
    }
}

impl Default for LtsvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One result row: output column name to value, `None` meaning NULL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    cells: BTreeMap<String, Option<String>>,
}

impl ResultRow {
    /// Creates an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.cells.insert(column.into(), value);
    }

    /// Returns `true` if the row has `column`, null or not
    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Cell text; `None` both for NULL and for an absent column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(|value| value.as_deref())
    }

    /// Returns `true` if `column` is present and NULL
    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.cells.get(column), Some(None))
    }

    /// Column names in byte order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Cells in column byte order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(column, value)| (column.as_str(), value.as_deref()))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Convert executor output. Hidden columns are dropped and a repeated
    /// output name keeps its last value.
    pub fn from_result_set(set: ResultSet) -> Vec<ResultRow> {
        let ResultSet { columns, rows } = set;
        rows.into_iter()
            .map(|values| {
                columns
                    .iter()
                    .zip(values)
                    .filter(|(column, _)| !column.hidden)
                    .map(|(column, value)| (column.name.clone(), value.into_text()))
                    .collect()
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut row = ResultRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}
