//! Whitespace-run delimited tables.
//!
//! Each run of spaces or tabs separates two fields. There is no quoting, so
//! values cannot contain spaces; rows whose field count does not match the
//! header are still produced and left to validation.

use crate::model::record::RawRow;

use super::{normalize_header, RecordSource};

/// Minimal native reader for whitespace-separated text.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceSource;

impl RecordSource for WhitespaceSource {
    fn rows<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = RawRow> + 'a> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let Some(header_line) = lines.next() else {
            return Box::new(std::iter::empty());
        };
        let headers: Vec<String> = header_line.split_whitespace().map(normalize_header).collect();

        Box::new(lines.enumerate().map(move |(i, line)| {
            RawRow::new(
                i as u64 + 1,
                headers
                    .iter()
                    .cloned()
                    .zip(line.split_whitespace().map(str::to_string)),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_rows() {
        let rows: Vec<RawRow> = WhitespaceSource
            .rows("SNo  Name Email\tTitle Company\n7 Ann ann@x.com Eng Acme\r\n\n8 Bo bo@y.com Ops Beta\n")
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ordinal(), 7);
        assert_eq!(rows[0].get("Title"), "Eng");
        assert_eq!(rows[1].get("Company"), "Beta");
        assert_eq!(rows[1].position(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(WhitespaceSource.rows("").count(), 0);
        assert_eq!(WhitespaceSource.rows("\n\n").count(), 0);
    }

    #[test]
    fn test_short_row() {
        let rows: Vec<RawRow> = WhitespaceSource.rows("Name Email Title\nAnn\n").collect();
        assert_eq!(rows[0].get("Name"), "Ann");
        assert!(!rows[0].has("Email"));
    }
}
