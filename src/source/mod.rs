//! Contact table ingestion.
//!
//! Turns raw tabular text into a lazy stream of [`RawRow`]s. The delimiter is
//! detected once, up front (see [`dialect`]), and that decision selects which
//! [`RecordSource`] implementation reads the rest of the text.

pub mod delimited;
pub mod dialect;
pub mod whitespace;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{MailcastError, Result};
use crate::model::record::RawRow;

use self::delimited::DelimitedSource;
use self::dialect::{Delimiter, Dialect};
use self::whitespace::WhitespaceSource;

/// Something that can read header-first tabular text into rows.
///
/// The first non-blank line names the columns. Every following non-blank line
/// produces exactly one [`RawRow`], whatever its shape.
pub trait RecordSource {
    fn rows<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = RawRow> + 'a>;
}

/// Pick the reader implementation for a delimiter.
pub fn source_for(delimiter: Delimiter) -> Box<dyn RecordSource> {
    match delimiter.as_byte() {
        Some(byte) => Box::new(DelimitedSource::new(byte)),
        None => Box::new(WhitespaceSource),
    }
}

/// Lazy, single-pass sequence of rows from one contact table.
pub struct Rows<'a> {
    dialect: Dialect,
    inner: Box<dyn Iterator<Item = RawRow> + 'a>,
}

impl Rows<'_> {
    /// The delimiter decision made for this table.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl Iterator for Rows<'_> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        self.inner.next()
    }
}

/// Parse contact table text.
///
/// A leading byte-order mark is dropped before delimiter detection.
pub fn parse(raw_text: &str) -> Rows<'_> {
    let text = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    let dialect = dialect::detect(text);
    debug!(delimiter = %dialect.delimiter, detection = ?dialect.detection, "Resolved table dialect");
    Rows {
        dialect,
        inner: source_for(dialect.delimiter).rows(text),
    }
}

/// Decode raw file bytes into text.
///
/// A UTF-8 or UTF-16 byte-order mark selects the encoding (and is removed);
/// otherwise UTF-8 is assumed. Invalid sequences become U+FFFD instead of
/// failing the whole table.
pub fn decode_input(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        tracing::warn!(encoding = encoding.name(), "Input contained invalid byte sequences");
    }
    text.into_owned()
}

/// Read and decode a contact table from disk.
pub fn read_table(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| MailcastError::open(path, e))?;
    info!(path = %path.display(), bytes = bytes.len(), "Reading contact table");
    Ok(decode_input(&bytes))
}

/// Canonical form of a header cell: trimmed, stray BOMs removed.
pub(crate) fn normalize_header(raw: &str) -> String {
    raw.trim().replace('\u{feff}', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_stripped_before_header() {
        let rows: Vec<RawRow> = parse("\u{feff}SNo,Name,Email,Title,Company\n1,Ann,ann@x.com,Eng,Acme\n").collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ordinal(), 1);
        assert!(rows[0].has("SNo"));
    }

    #[test]
    fn test_dialect_exposed() {
        let rows = parse("SNo\tName\tEmail\tTitle\tCompany\n1\tAnn\tann@x.com\tEng\tAcme\n");
        assert_eq!(rows.dialect().delimiter, Delimiter::Tab);
        assert_eq!(rows.count(), 1);
    }

    #[test]
    fn test_column_order_irrelevant() {
        let rows: Vec<RawRow> = parse("Email,Company,Name,Title,SNo\nann@x.com,Acme,Ann,Eng,5\n").collect();
        assert_eq!(rows[0].get("Name"), "Ann");
        assert_eq!(rows[0].ordinal(), 5);
    }

    #[test]
    fn test_header_names_case_sensitive() {
        let rows: Vec<RawRow> = parse("sno,name,email\n1,Ann,ann@x.com\n").collect();
        assert_eq!(rows[0].get("Name"), "");
        assert_eq!(rows[0].get("name"), "Ann");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let bytes = b"\xEF\xBB\xBFName\nAnn\n";
        assert_eq!(decode_input(bytes), "Name\nAnn\n");
    }

    #[test]
    fn test_decode_utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Name\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_input(&bytes), "Name\n");
    }

    #[test]
    fn test_decode_invalid_bytes_replaced() {
        let text = decode_input(b"Name\nAnn\xFF\n");
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn test_read_table_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_table(tmp.path().join("none.csv")).unwrap_err();
        assert!(matches!(err, MailcastError::FileNotFound(_)));
    }
}
