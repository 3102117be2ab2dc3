//! Single-byte-delimited tables (comma, tab) read with the `csv` crate.
//!
//! Quote-aware and tolerant: rows with too few or too many fields are
//! accepted (`flexible`), blank lines are skipped, every value is trimmed.

use tracing::warn;

use crate::model::record::RawRow;

use super::{normalize_header, RecordSource};

/// Reader for comma- or tab-separated text.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedSource {
    delimiter: u8,
}

impl DelimitedSource {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl RecordSource for DelimitedSource {
    fn rows<'a>(&self, text: &'a str) -> Box<dyn Iterator<Item = RawRow> + 'a> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(h) => h.iter().map(normalize_header).collect(),
            Err(e) => {
                warn!(error = %e, "Could not read header row");
                return Box::new(std::iter::empty());
            }
        };

        Box::new(
            reader
                .into_records()
                .enumerate()
                .map(move |(i, result)| {
                    let position = i as u64 + 1;
                    match result {
                        Ok(record) => RawRow::new(
                            position,
                            headers
                                .iter()
                                .cloned()
                                .zip(record.iter().map(str::to_string)),
                        ),
                        Err(e) => {
                            // Surface the row anyway; validation will skip it.
                            warn!(position, error = %e, "Malformed row");
                            RawRow::new(position, std::iter::empty())
                        }
                    }
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str, delimiter: u8) -> Vec<RawRow> {
        DelimitedSource::new(delimiter).rows(text).collect()
    }

    #[test]
    fn test_comma_rows() {
        let rows = collect(
            "SNo,Name,Email,Title,Company\n1,Ann,ann@x.com,Eng,Acme\n2,Bo,bo@y.com,Ops,Beta\n",
            b',',
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Name"), "Ann");
        assert_eq!(rows[1].get("Company"), "Beta");
        assert_eq!(rows[1].ordinal(), 2);
    }

    #[test]
    fn test_quoted_field() {
        let rows = collect(
            "SNo,Name,Email,Title,Company\n1,\"Lee, Ann\",ann@x.com,Eng,\"Acme, Inc\"\n",
            b',',
        );
        assert_eq!(rows[0].get("Name"), "Lee, Ann");
        assert_eq!(rows[0].get("Company"), "Acme, Inc");
    }

    #[test]
    fn test_short_row_lacks_fields() {
        let rows = collect("SNo,Name,Email,Title,Company\n1,Ann\n", b',');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), "Ann");
        assert!(!rows[0].has("Email"));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let rows = collect("Name,Email\nAnn,ann@x.com,surplus\n", b',');
        assert_eq!(rows[0].get("Email"), "ann@x.com");
    }

    #[test]
    fn test_spaces_after_comma_trimmed() {
        let rows = collect("SNo, Name, Email\n1,  Ann ,  ann@x.com\n", b',');
        assert_eq!(rows[0].get("Name"), "Ann");
        assert_eq!(rows[0].get("Email"), "ann@x.com");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let rows = collect("Name,Email\n\nAnn,ann@x.com\n\nBo,bo@y.com\n", b',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].position(), 2);
    }

    #[test]
    fn test_tab_rows() {
        let rows = collect("Name\tEmail\nAnn\tann@x.com\n", b'\t');
        assert_eq!(rows[0].get("Email"), "ann@x.com");
    }

    #[test]
    fn test_header_only() {
        assert!(collect("SNo,Name,Email,Title,Company\n", b',').is_empty());
    }
}
