//! Line-by-line ingestion
//!
//! Reads LTSV input to exhaustion and feeds every line to a table. A line that
//! cannot be parsed or stored is logged and skipped; only read failures end
//! ingestion early.

use crate::error::{Error, Result};
use crate::record::{parse_record, Delimiters};
use crate::table::LtsvTable;
use std::io::{self, BufRead, Read};
use tracing::{info, warn};

/// Counters for one ingestion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Lines read from the input
    pub lines: usize,
    /// Rows committed to the table
    pub inserted: usize,
    /// Lines rejected by the record parser
    pub malformed: usize,
    /// Parsed records the table refused (schema or row write)
    pub rejected: usize,
}

impl IngestStats {
    /// Lines that did not become rows
    pub fn skipped(&self) -> usize {
        self.malformed + self.rejected
    }
}

/// Ingest every line of `reader` into `table`
pub fn ingest<R: BufRead>(
    table: &mut LtsvTable,
    mut reader: R,
    delimiters: Delimiters,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();
    let max = table.limits().max_line_bytes;

    loop {
        buf.clear();
        let overlong = match read_line_capped(&mut reader, &mut buf, max.saturating_add(2))? {
            Some(overlong) => overlong,
            None => break,
        };
        stats.lines += 1;

        let outcome = if overlong {
            Err(Error::MalformedRecord(format!(
                "line exceeds maximum length {}",
                max
            )))
        } else {
            ingest_line(table, &buf, delimiters)
        };

        match outcome {
            Ok(_) => stats.inserted += 1,
            Err(err) if err.is_recoverable() => {
                if matches!(err, Error::MalformedRecord(_)) {
                    stats.malformed += 1;
                } else {
                    stats.rejected += 1;
                }
                warn!(line = stats.lines, error = %err, "Skipping input line");
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        lines = stats.lines,
        inserted = stats.inserted,
        skipped = stats.skipped(),
        columns = table.columns().len(),
        "Ingestion complete"
    );
    Ok(stats)
}

/// Read one line into `buf`, storing at most `cap` bytes.
///
/// Returns `None` at end of input and `Some(true)` when the line ran past
/// `cap`; the rest of such a line is consumed without being kept.
fn read_line_capped<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, cap: usize) -> io::Result<Option<bool>> {
    let read = reader.by_ref().take(cap as u64).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(None);
    }
    if read < cap || buf.last() == Some(&b'\n') {
        return Ok(Some(false));
    }

    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
    Ok(Some(true))
}

fn ingest_line(table: &mut LtsvTable, raw: &[u8], delimiters: Delimiters) -> Result<usize> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| Error::MalformedRecord(format!("invalid UTF-8: {}", e)))?;
    let line = line.trim_end_matches(['\n', '\r']);
    table.limits().check_line(line)?;

    let record = parse_record(line, delimiters)?;
    table.insert(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::ResourceLimits;
    use std::io::{self, Cursor, Read};

    #[test]
    fn test_ingest_counts() {
        let input = "a:1\tb:2\nnot a record\n\nb:3\tc:4\r\n";
        let mut table = LtsvTable::new();

        let stats = ingest(&mut table, Cursor::new(input), Delimiters::default()).unwrap();

        assert_eq!(
            stats,
            IngestStats {
                lines: 4,
                inserted: 2,
                malformed: 2,
                rejected: 0,
            }
        );
        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert_eq!(table.get(1, "c"), Some("4"));
    }

    #[test]
    fn test_missing_final_newline() {
        let mut table = LtsvTable::new();
        let stats = ingest(&mut table, Cursor::new("a:1\na:2"), Delimiters::default()).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(table.get(1, "a"), Some("2"));
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let input: &[u8] = b"a:\xff\xfe\na:ok\n";
        let mut table = LtsvTable::new();

        let stats = ingest(&mut table, input, Delimiters::default()).unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rejected_records_are_counted() {
        let limits = ResourceLimits::default().with_max_columns(1);
        let mut table = LtsvTable::new().with_limits(limits);

        let stats = ingest(&mut table, Cursor::new("a:1\nb:2\na:3\n"), Delimiters::default()).unwrap();

        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.skipped(), 1);
    }

    #[test]
    fn test_long_line_is_malformed() {
        let limits = ResourceLimits::default().with_max_line_bytes(8);
        let mut table = LtsvTable::new().with_limits(limits);

        let stats = ingest(
            &mut table,
            Cursor::new("a:1\nkey:much too long\n"),
            Delimiters::default(),
        )
        .unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_overlong_line_is_not_buffered() {
        let long = io::repeat(b'x').take(4 << 20);
        let mut reader = io::BufReader::new(long.chain(Cursor::new("\nk:v\n")));
        let mut buf = Vec::new();

        assert_eq!(read_line_capped(&mut reader, &mut buf, 10).unwrap(), Some(true));
        assert_eq!(buf.len(), 10);

        buf.clear();
        assert_eq!(read_line_capped(&mut reader, &mut buf, 10).unwrap(), Some(false));
        assert_eq!(buf, b"k:v\n");

        buf.clear();
        assert_eq!(read_line_capped(&mut reader, &mut buf, 10).unwrap(), None);
    }

    #[test]
    fn test_overlong_line_without_newline() {
        struct Counting<R> {
            inner: R,
            bytes: usize,
        }
        impl<R: Read> Read for Counting<R> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = self.inner.read(buf)?;
                self.bytes += n;
                Ok(n)
            }
        }

        let limits = ResourceLimits::default().with_max_line_bytes(8);
        let mut table = LtsvTable::new().with_limits(limits);
        let mut reader = io::BufReader::new(Counting {
            inner: Cursor::new("a:1\n").chain(io::repeat(b'y').take(1 << 20)),
            bytes: 0,
        });

        let stats = ingest(&mut table, &mut reader, Delimiters::default()).unwrap();

        assert_eq!(reader.get_ref().bytes, 4 + (1 << 20));
        assert_eq!(
            stats,
            IngestStats {
                lines: 2,
                inserted: 1,
                malformed: 1,
                rejected: 0,
            }
        );
    }

    #[test]
    fn test_exact_limit_line_is_kept() {
        let limits = ResourceLimits::default().with_max_line_bytes(8);
        let mut table = LtsvTable::new().with_limits(limits);

        let stats = ingest(
            &mut table,
            Cursor::new("key:1234\r\nkey:5678"),
            Delimiters::default(),
        )
        .unwrap();

        assert_eq!(stats.inserted, 2);
        assert_eq!(table.get(1, "key"), Some("5678"));
    }

    #[test]
    fn test_read_error_is_fatal() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
            }
        }

        let mut table = LtsvTable::new();
        let err = ingest(&mut table, io::BufReader::new(Failing), Delimiters::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
