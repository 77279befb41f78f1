//! # ltsvq core
//!
//! Ingests LTSV (labeled tab-separated values) lines whose field sets vary
//! from line to line, folds them into one relation whose column set grows on
//! demand, runs a SQL-like query against it and writes the result back out as
//! LTSV.
//!
//! ```
//! use ltsvq_core::{Delimiters, LtsvTable, OutputFormatter};
//!
//! # fn main() -> ltsvq_core::Result<()> {
//! let mut table = LtsvTable::new();
//! table.insert_line("host:a\tstatus:200", Delimiters::default())?;
//! table.insert_line("host:b\tsize:10", Delimiters::default())?;
//!
//! let rows = table.query("SELECT host, status FROM ltsv ORDER BY host DESC")?;
//!
//! let mut out = OutputFormatter::new(Vec::new());
//! out.write_all(&rows)?;
//! assert_eq!(out.finish()?, b"host:b\tstatus:\t\nhost:a\tstatus:200\t\n");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format;
pub mod ingest;
pub mod limits;
pub mod query;
pub mod record;
pub mod schema;
pub mod table;

pub use error::{Error, Result};
pub use format::{MissingColumnPolicy, OutputFormatter};
pub use ingest::{ingest, IngestStats};
pub use limits::ResourceLimits;
pub use record::{parse_record, Delimiters, Record};
pub use schema::Schema;
pub use table::{LtsvTable, ResultRow, RowId, DEFAULT_TABLE_NAME};
