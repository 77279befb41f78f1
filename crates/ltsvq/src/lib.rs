//! # ltsvq
//!
//! Run one SQL query over a stream of LTSV log records and print the result
//! as LTSV.
//!
//! Every input line is folded into a single relation (`ltsv` by default) whose
//! columns are the union of all keys seen so far. Once the input is exhausted
//! the query runs once and its rows are written back out, with the first row
//! fixing the output columns.
//!
//! ## Quick Start
//!
//! ```rust
//! use ltsvq::{run_with, Config};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = "host:a\tstatus:200\nhost:b\tstatus:500\tsize:10\n";
//!     let config = Config::new("SELECT host FROM ltsv WHERE status >= 500");
//!
//!     let mut output = Vec::new();
//!     let stats = run_with(&config, input.as_bytes(), &mut output)?;
//!
//!     assert_eq!(stats.ingest.inserted, 2);
//!     assert_eq!(String::from_utf8(output)?, "host:b\t\n");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;

pub use config::Config;
pub use ltsvq_core::{
    ingest, query, Delimiters, Error, IngestStats, LtsvTable, MissingColumnPolicy,
    OutputFormatter, ResourceLimits, Result, ResultRow,
};

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{debug, info};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Counters for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Ingestion counters
    pub ingest: IngestStats,
    /// Result rows written
    pub rows_written: usize,
}

/// Run the configured query, reading and writing the configured files
/// (stdin and stdout when unset).
///
/// The output file is only created once the query has succeeded, so a bad
/// query never truncates an existing file.
pub fn run(config: &Config) -> Result<RunStats> {
    config.validate()?;

    let reader: Box<dyn BufRead> = match &config.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let (stats, rows) = ingest_and_query(config, reader)?;

    let writer: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let rows_written = write_rows(config, &rows, writer)?;

    Ok(RunStats {
        ingest: stats,
        rows_written,
    })
}

/// Run the configured query over `reader`, writing the result to `writer`.
///
/// `config.input` and `config.output` are ignored.
pub fn run_with<R: BufRead, W: Write>(config: &Config, reader: R, writer: W) -> Result<RunStats> {
    config.validate()?;

    let (stats, rows) = ingest_and_query(config, reader)?;
    let rows_written = write_rows(config, &rows, writer)?;

    Ok(RunStats {
        ingest: stats,
        rows_written,
    })
}

fn ingest_and_query<R: BufRead>(config: &Config, reader: R) -> Result<(IngestStats, Vec<ResultRow>)> {
    // Reject a bad query before spending time on the input
    config.limits.check_query(&config.query)?;
    query::prepare(&config.query)?;

    let mut table = LtsvTable::with_name(config.table.clone()).with_limits(config.limits.clone());
    let stats = ingest(&mut table, reader, config.delimiters)?;

    let rows = table.query(&config.query)?;
    info!(rows = rows.len(), columns = table.columns().len(), "Query complete");
    Ok((stats, rows))
}

fn write_rows<W: Write>(config: &Config, rows: &[ResultRow], writer: W) -> Result<usize> {
    let mut formatter = OutputFormatter::new(writer)
        .with_delimiters(config.delimiters)
        .with_policy(config.missing_columns);

    let written = formatter.write_all(rows)?;
    if let Some(columns) = formatter.columns() {
        debug!(?columns, "Output columns");
    }
    formatter.finish()?;
    Ok(written)
}
