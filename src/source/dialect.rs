//! Delimiter detection for contact tables.
//!
//! Resolution order:
//! 1. Sniff a leading sample for a comma, tab or whitespace-run delimiter
//!    that splits every sampled line into the same number of fields.
//! 2. If sniffing is inconclusive, assume comma.
//! 3. If comma yields fewer than 2 fields on the first data line, switch to
//!    whitespace runs.

use serde::Serialize;
use tracing::{debug, info, warn};

/// Number of leading bytes inspected by the sniffer.
pub const SNIFF_SAMPLE_BYTES: usize = 8192;

/// Maximum number of lines the sniffer looks at.
const SNIFF_MAX_LINES: usize = 20;

/// Share of sampled lines that must agree with the header's field count.
const CONSISTENCY_THRESHOLD: f64 = 0.9;

/// Field separator of a contact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Tab,
    /// One or more consecutive spaces or tabs.
    Whitespace,
}

impl Delimiter {
    /// The single separator byte, if the delimiter is one.
    pub fn as_byte(self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Whitespace => None,
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Delimiter::Comma => "comma",
            Delimiter::Tab => "tab",
            Delimiter::Whitespace => "whitespace",
        })
    }
}

/// How the delimiter was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// The sniffer found a consistent delimiter.
    Sniffed,
    /// Sniffing failed; comma was assumed.
    CommaFallback,
    /// Comma produced a single field on the first data line.
    WhitespaceFallback,
}

/// Result of delimiter detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dialect {
    pub delimiter: Delimiter,
    pub detection: Detection,
}

/// Resolve the delimiter for `text` (BOM already stripped).
pub fn detect(text: &str) -> Dialect {
    let (delimiter, detection) = match sniff(sample(text)) {
        Some(d) => {
            info!(delimiter = %d, "Sniffer detected delimiter");
            (d, Detection::Sniffed)
        }
        None => {
            warn!("Sniffer could not detect delimiter; defaulting to comma");
            (Delimiter::Comma, Detection::CommaFallback)
        }
    };

    if delimiter == Delimiter::Comma {
        if let Some(first_data) = non_blank_lines(text).nth(1) {
            if count_fields(first_data, b',') < 2 {
                info!("First data line has a single comma field; using whitespace delimiting");
                return Dialect {
                    delimiter: Delimiter::Whitespace,
                    detection: Detection::WhitespaceFallback,
                };
            }
        }
    }

    Dialect {
        delimiter,
        detection,
    }
}

/// Sniff a delimiter from a text sample.
///
/// A candidate qualifies when the header splits into at least two fields and
/// at least 90% of the sampled lines split into the same number of fields.
/// Between comma and tab the one producing more header fields wins; ties go
/// to comma. When neither is that consistent, a candidate whose header and
/// most data lines split into several fields is taken instead. Whitespace
/// runs are only considered when comma and tab both fail.
pub fn sniff(sample: &str) -> Option<Delimiter> {
    let lines: Vec<&str> = non_blank_lines(sample).take(SNIFF_MAX_LINES).collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(Delimiter, usize)> = None;
    let mut loose: Option<(Delimiter, usize)> = None;
    for (delimiter, byte) in [(Delimiter::Comma, b','), (Delimiter::Tab, b'\t')] {
        let counts: Vec<usize> = lines.iter().map(|l| count_fields(l, byte)).collect();
        if let Some(width) = consistent_width(&counts) {
            debug!(delimiter = %delimiter, width, "Delimiter candidate is consistent");
            if best.map_or(true, |(_, w)| width > w) {
                best = Some((delimiter, width));
            }
        } else if let Some(width) = mostly_split(&counts) {
            debug!(delimiter = %delimiter, width, "Delimiter candidate splits most rows");
            if loose.map_or(true, |(_, w)| width > w) {
                loose = Some((delimiter, width));
            }
        }
    }
    if let Some((delimiter, _)) = best.or(loose) {
        return Some(delimiter);
    }

    let counts: Vec<usize> = lines
        .iter()
        .map(|l| l.split_whitespace().count())
        .collect();
    consistent_width(&counts).map(|_| Delimiter::Whitespace)
}

/// The header's field count, if it is at least 2 and shared by enough lines.
fn consistent_width(counts: &[usize]) -> Option<usize> {
    let header = *counts.first()?;
    if header < 2 {
        return None;
    }
    let agreeing = counts.iter().filter(|&&c| c == header).count();
    let ratio = agreeing as f64 / counts.len() as f64;
    (ratio >= CONSISTENCY_THRESHOLD).then_some(header)
}

/// The header's field count, if it is at least 2 and more than half of the
/// data lines split into several fields too.
///
/// Lets a ragged table keep its real delimiter: short rows then surface as
/// rows with missing fields instead of flipping the whole table to
/// whitespace splitting.
fn mostly_split(counts: &[usize]) -> Option<usize> {
    let (&header, data) = counts.split_first()?;
    if header < 2 || data.is_empty() {
        return None;
    }
    let split = data.iter().filter(|&&c| c > 1).count();
    (split * 2 > data.len()).then_some(header)
}

/// Number of fields `line` splits into on `delimiter`, ignoring delimiters
/// inside double-quoted sections.
pub fn count_fields(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            fields += 1;
        }
    }
    fields
}

/// Leading sample of `text`, cut back to the last complete line when the
/// text is longer than [`SNIFF_SAMPLE_BYTES`].
fn sample(text: &str) -> &str {
    if text.len() <= SNIFF_SAMPLE_BYTES {
        return text;
    }
    let mut end = SNIFF_SAMPLE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let head = &text[..end];
    match head.rfind('\n') {
        Some(pos) => &head[..pos],
        None => head,
    }
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| !l.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_comma() {
        let text = "SNo,Name,Email,Title,Company\n1,Ann,ann@x.com,Eng,Acme\n";
        assert_eq!(sniff(text), Some(Delimiter::Comma));
    }

    #[test]
    fn test_sniff_tab() {
        let text = "SNo\tName\tEmail\tTitle\tCompany\n1\tAnn\tann@x.com\tEng\tAcme\n";
        assert_eq!(sniff(text), Some(Delimiter::Tab));
    }

    #[test]
    fn test_sniff_tab_with_commas_in_values() {
        let text = "SNo\tName\tEmail\tTitle\tCompany\n1\tAnn\tann@x.com\tEng\tAcme, Inc\n";
        assert_eq!(sniff(text), Some(Delimiter::Tab));
    }

    #[test]
    fn test_sniff_whitespace() {
        let text = "SNo Name  Email Title Company\n1 Ann ann@x.com Eng Acme\n";
        assert_eq!(sniff(text), Some(Delimiter::Whitespace));
    }

    #[test]
    fn test_sniff_quoted_commas_ignored() {
        let text = "SNo,Name,Email,Title,Company\n1,\"Lee, Ann\",ann@x.com,Eng,Acme\n";
        assert_eq!(sniff(text), Some(Delimiter::Comma));
    }

    #[test]
    fn test_sniff_inconsistent_fails() {
        let text = "SNo Name Email Title Company\n1 Ann Lee ann@x.com Eng Acme\n2 Bo bo@y.com Ops Big Co Ltd\n";
        assert_eq!(sniff(text), None);
    }

    #[test]
    fn test_sniff_tab_with_short_row() {
        let text = "SNo\tName\tEmail\tTitle\tCompany\n1\tAnn Lee\tann@x.com\tEng\tAcme\n2\tBob Stone\tbob@y.com\tOps\tBeta\n3\tCy\n";
        assert_eq!(sniff(text), Some(Delimiter::Tab));
        let d = detect(text);
        assert_eq!(d.delimiter, Delimiter::Tab);
        assert_eq!(d.detection, Detection::Sniffed);
    }

    #[test]
    fn test_consistent_candidate_beats_ragged_one() {
        // Tab splits every line the same way; commas only appear in values.
        let text = "Name\tEmail\tCompany\nAnn\tann@x.com\tAcme, Inc\nBo\tbo@y.com\tBeta, Ltd\n";
        assert_eq!(sniff(text), Some(Delimiter::Tab));
    }

    #[test]
    fn test_detect_falls_back_to_comma() {
        let text = "SNo Name Email Title Company\n1 Ann Lee ann@x.com Eng Acme\n2 Bo bo@y.com Ops Big Co Ltd\n";
        // Comma parsing of the first data line gives 1 field -> whitespace.
        let d = detect(text);
        assert_eq!(d.delimiter, Delimiter::Whitespace);
        assert_eq!(d.detection, Detection::WhitespaceFallback);
    }

    #[test]
    fn test_detect_comma_fallback_kept_when_data_has_commas() {
        // Header alone is ambiguous; data line has commas.
        let text = "Contacts\n1,Ann,ann@x.com,Eng,Acme\n";
        let d = detect(text);
        assert_eq!(d.delimiter, Delimiter::Comma);
        assert_eq!(d.detection, Detection::CommaFallback);
    }

    #[test]
    fn test_detect_sniffed() {
        let d = detect("SNo,Name,Email,Title,Company\n1,Ann,ann@x.com,Eng,Acme");
        assert_eq!(d.delimiter, Delimiter::Comma);
        assert_eq!(d.detection, Detection::Sniffed);
    }

    #[test]
    fn test_count_fields() {
        assert_eq!(count_fields("a,b,c", b','), 3);
        assert_eq!(count_fields("a,\"b,c\"", b','), 2);
        assert_eq!(count_fields("abc", b','), 1);
    }

    #[test]
    fn test_sample_cuts_at_line() {
        let line = "a,b,c\n";
        let text = line.repeat(SNIFF_SAMPLE_BYTES / line.len() + 10);
        let s = sample(&text);
        assert!(s.len() <= SNIFF_SAMPLE_BYTES);
        assert!(s.ends_with('c'));
    }
}
