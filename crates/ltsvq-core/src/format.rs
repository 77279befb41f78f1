//! LTSV result formatting
//!
//! The first result row fixes the output columns (its column names in byte
//! order) for the whole run. Every row is then written as `column:value`
//! pairs, each followed by the field delimiter, and a newline. NULL renders as
//! empty text.

use crate::error::{Error, Result};
use crate::record::Delimiters;
use crate::table::ResultRow;
use std::fmt;
use std::io::{BufWriter, Write};
use std::str::FromStr;
use tracing::debug;

/// What to do when a row lacks one of the output columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingColumnPolicy {
    /// Fail with [`Error::Output`]
    #[default]
    Error,
    /// Write the column with an empty value
    Blank,
}

impl FromStr for MissingColumnPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(MissingColumnPolicy::Error),
            "blank" => Ok(MissingColumnPolicy::Blank),
            other => Err(Error::Config(format!(
                "unknown missing-column policy '{}' (expected 'error' or 'blank')",
                other
            ))),
        }
    }
}

impl fmt::Display for MissingColumnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingColumnPolicy::Error => write!(f, "error"),
            MissingColumnPolicy::Blank => write!(f, "blank"),
        }
    }
}

/// Buffered LTSV writer for result rows
pub struct OutputFormatter<W: Write> {
    writer: BufWriter<W>,
    delimiters: Delimiters,
    policy: MissingColumnPolicy,
    columns: Option<Vec<String>>,
    rows_written: usize,
}

impl<W: Write> OutputFormatter<W> {
    /// Creates a formatter with default delimiters and policy
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            delimiters: Delimiters::default(),
            policy: MissingColumnPolicy::default(),
            columns: None,
            rows_written: 0,
        }
    }

    /// Use custom delimiters
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Set the missing-column policy
    pub fn with_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Output columns, once the first row has fixed them
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Format and buffer one row.
    ///
    /// A row rejected by the missing-column policy writes nothing.
    pub fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        let columns = self
            .columns
            .get_or_insert_with(|| row.columns().map(str::to_string).collect());

        let mut line = String::new();
        for column in columns.iter() {
            let value = if row.contains(column) {
                row.get(column).unwrap_or("")
            } else {
                match self.policy {
                    MissingColumnPolicy::Error => {
                        return Err(Error::Output(format!(
                            "row {} has no column '{}'",
                            self.rows_written + 1,
                            column
                        )));
                    }
                    MissingColumnPolicy::Blank => "",
                }
            };
            line.push_str(column);
            line.push(self.delimiters.kv());
            line.push_str(value);
            line.push(self.delimiters.field());
        }
        line.push('\n');

        let extra: Vec<&str> = row
            .columns()
            .filter(|c| columns.binary_search_by(|known| known.as_str().cmp(c)).is_err())
            .collect();
        if !extra.is_empty() {
            debug!(row = self.rows_written + 1, ?extra, "Dropping columns not in output set");
        }

        self.writer
            .write_all(line.as_bytes())
            .map_err(|e| Error::Output(e.to_string()))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write every row, returning how many were written
    pub fn write_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a ResultRow>) -> Result<usize> {
        let before = self.rows_written;
        for row in rows {
            self.write_row(row)?;
        }
        Ok(self.rows_written - before)
    }

    /// Flush buffered output and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Output(e.error().to_string()))
            .and_then(|mut writer| {
                writer
                    .flush()
                    .map_err(|e| Error::Output(e.to_string()))?;
                Ok(writer)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, Option<&str>)]) -> ResultRow {
        cells
            .iter()
            .map(|(c, v)| (*c, v.map(str::to_string)))
            .collect()
    }

    fn render(rows: &[ResultRow], policy: MissingColumnPolicy) -> Result<String> {
        let mut formatter = OutputFormatter::new(Vec::new()).with_policy(policy);
        formatter.write_all(rows)?;
        let bytes = formatter.finish()?;
        Ok(String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_no_rows_no_output() {
        assert_eq!(render(&[], MissingColumnPolicy::Error).unwrap(), "");
    }

    #[test]
    fn test_columns_sorted_with_trailing_separator() {
        let rows = [row(&[("b", Some("2")), ("a", Some("1")), ("c", None)])];
        assert_eq!(
            render(&rows, MissingColumnPolicy::Error).unwrap(),
            "a:1\tb:2\tc:\t\n"
        );
    }

    #[test]
    fn test_first_row_fixes_columns() {
        let rows = [
            row(&[("a", Some("1"))]),
            row(&[("a", Some("2")), ("z", Some("dropped"))]),
        ];
        assert_eq!(
            render(&rows, MissingColumnPolicy::Error).unwrap(),
            "a:1\t\na:2\t\n"
        );
    }

    #[test]
    fn test_missing_column_policy() {
        let rows = [
            row(&[("a", Some("1")), ("b", Some("2"))]),
            row(&[("a", Some("3"))]),
        ];

        let err = render(&rows, MissingColumnPolicy::Error).unwrap_err();
        assert!(matches!(err, Error::Output(ref msg) if msg.contains("'b'")));

        assert_eq!(
            render(&rows, MissingColumnPolicy::Blank).unwrap(),
            "a:1\tb:2\t\na:3\tb:\t\n"
        );
    }

    #[test]
    fn test_same_width_row_logs_dropped_columns() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);
        impl Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let rows = [
            row(&[("a", Some("1")), ("b", Some("2"))]),
            row(&[("a", Some("3")), ("z", Some("4"))]),
        ];
        let output = tracing::subscriber::with_default(subscriber, || {
            render(&rows, MissingColumnPolicy::Blank).unwrap()
        });

        assert_eq!(output, "a:1\tb:2\t\na:3\tb:\t\n");
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Dropping columns not in output set"));
        assert!(logs.contains("\"z\""));
    }

    #[test]
    fn test_custom_delimiters() {
        let mut formatter = OutputFormatter::new(Vec::new())
            .with_delimiters(Delimiters::new(',', '=').unwrap());
        formatter.write_row(&row(&[("k", Some("v"))])).unwrap();
        assert_eq!(formatter.columns(), Some(&["k".to_string()][..]));
        assert_eq!(formatter.finish().unwrap(), b"k=v,\n");
    }

    #[test]
    fn test_write_failure_is_output_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut formatter = OutputFormatter::new(Broken);
        formatter.write_row(&row(&[("a", Some("1"))])).unwrap();
        assert!(matches!(formatter.finish(), Err(Error::Output(_))));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("BLANK".parse::<MissingColumnPolicy>().unwrap(), MissingColumnPolicy::Blank);
        assert!("ignore".parse::<MissingColumnPolicy>().is_err());
    }
}
