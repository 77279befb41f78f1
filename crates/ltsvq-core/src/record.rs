//! LTSV record parsing
//!
//! A line is a sequence of `key:value` fields separated by a tab. Both
//! delimiters are configurable through [`Delimiters`]. Values are kept as
//! verbatim text; a field is split at the first key/value delimiter, so
//! values may themselves contain it (`time:12:00:01`).

use crate::error::{Error, Result};
use std::fmt;

/// Field and key/value delimiters of the record format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    field: char,
    kv: char,
}

impl Delimiters {
    /// Create a delimiter pair.
    ///
    /// The two delimiters must differ and neither may be a line break.
    pub fn new(field: char, kv: char) -> Result<Self> {
        if field == kv {
            return Err(Error::Config(format!(
                "field and key/value delimiters must differ (both are {:?})",
                field
            )));
        }
        if matches!(field, '\n' | '\r') || matches!(kv, '\n' | '\r') {
            return Err(Error::Config(
                "delimiters cannot be line breaks".to_string(),
            ));
        }
        Ok(Self { field, kv })
    }

    /// Separator between fields (tab by default)
    pub fn field(&self) -> char {
        self.field
    }

    /// Separator between key and value (colon by default)
    pub fn kv(&self) -> char {
        self.kv
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '\t',
            kv: ':',
        }
    }
}

/// Ordered key/value pairs parsed from one line.
///
/// Keys are unique: a repeated key keeps the position of its first
/// occurrence and the value of its last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing an earlier value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Value stored for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}:{}", k, v)?;
        }
        Ok(())
    }
}

/// Parse one line into a [`Record`].
///
/// Surrounding whitespace is stripped first. Every field must contain the
/// key/value delimiter and a non-empty key, otherwise the whole line is
/// rejected with [`Error::MalformedRecord`].
pub fn parse_record(line: &str, delimiters: Delimiters) -> Result<Record> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::MalformedRecord("empty line".to_string()));
    }

    let mut record = Record::new();
    for (index, field) in line.split(delimiters.field()).enumerate() {
        let Some((key, value)) = field.split_once(delimiters.kv()) else {
            return Err(Error::MalformedRecord(format!(
                "field {} has no '{}' separator: {:?}",
                index + 1,
                delimiters.kv(),
                field
            )));
        };
        if key.is_empty() {
            return Err(Error::MalformedRecord(format!(
                "field {} has an empty key",
                index + 1
            )));
        }
        record.insert(key, value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Record> {
        parse_record(line, Delimiters::default())
    }

    #[test]
    fn test_simple_line() {
        let record = parse("host:127.0.0.1\tstatus:200\tsize:512").unwrap();

        assert_eq!(record.len(), 3);
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["host", "status", "size"]
        );
        assert_eq!(record.get("status"), Some("200"));
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let record = parse("time:12:00:01\turl:http://example.com/").unwrap();
        assert_eq!(record.get("time"), Some("12:00:01"));
        assert_eq!(record.get("url"), Some("http://example.com/"));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let record = parse("  a:1\tb:2 \r\n").unwrap();
        assert_eq!(record.get("a"), Some("1"));
        assert_eq!(record.get("b"), Some("2"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let record = parse("a:\tb:2").unwrap();
        assert_eq!(record.get("a"), Some(""));
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let record = parse("a:1\tb:2\ta:3").unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some("3"));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        assert!(matches!(parse("a:1\tjunk"), Err(Error::MalformedRecord(_))));
        assert!(matches!(parse("no separators"), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_empty_key_is_malformed() {
        assert!(matches!(parse(":value"), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_empty_line_is_malformed() {
        assert!(matches!(parse("   "), Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_custom_delimiters() {
        let delimiters = Delimiters::new(',', '=').unwrap();
        let record = parse_record("a=1,b=x:y", delimiters).unwrap();
        assert_eq!(record.get("a"), Some("1"));
        assert_eq!(record.get("b"), Some("x:y"));
    }

    #[test]
    fn test_invalid_delimiters() {
        assert!(matches!(Delimiters::new(':', ':'), Err(Error::Config(_))));
        assert!(matches!(Delimiters::new('\n', ':'), Err(Error::Config(_))));
    }

    #[test]
    fn test_display_round_trips_well_formed_records() {
        let line = "a:1\tb:x:y";
        assert_eq!(parse(line).unwrap().to_string(), line);
    }
}
