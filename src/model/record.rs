//! Contact rows: the raw parsed form and the validated, immutable form.

use std::collections::HashMap;

use super::address::Recipient;

/// Column holding the contact's ordinal.
pub const FIELD_SNO: &str = "SNo";
/// Column holding the contact's display name.
pub const FIELD_NAME: &str = "Name";
/// Column holding the contact's email address.
pub const FIELD_EMAIL: &str = "Email";
/// Column holding the contact's job title.
pub const FIELD_TITLE: &str = "Title";
/// Column holding the contact's organization.
pub const FIELD_COMPANY: &str = "Company";

/// The header vocabulary, in canonical order.
pub const HEADER_FIELDS: [&str; 5] = [FIELD_SNO, FIELD_NAME, FIELD_EMAIL, FIELD_TITLE, FIELD_COMPANY];

/// Fields that must be non-empty for a row to be sendable.
///
/// `SNo` is not here: a missing or non-numeric `SNo` falls back to the row
/// position instead of failing the row.
pub const REQUIRED_FIELDS: [&str; 4] = [FIELD_NAME, FIELD_EMAIL, FIELD_TITLE, FIELD_COMPANY];

/// One data row as it came out of the tabular parser, before validation.
///
/// Holds every column the header named (including unknown ones, which are
/// never looked at) plus the resolved ordinal. Short rows simply lack the
/// trailing columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    position: u64,
    ordinal: u64,
    fields: HashMap<String, String>,
}

impl RawRow {
    /// Build a row from its 1-based data-row position and column values.
    ///
    /// Values are trimmed. The ordinal is the `SNo` column when it parses as
    /// a positive integer, otherwise `position`.
    pub fn new(position: u64, fields: impl IntoIterator<Item = (String, String)>) -> Self {
        let fields: HashMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k, v.trim().to_string()))
            .collect();

        let ordinal = fields
            .get(FIELD_SNO)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(position);

        Self {
            position,
            ordinal,
            fields,
        }
    }

    /// 1-based position of this row among the data rows.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The ordinal used for correlation in the run log.
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Value of a column, or `""` when the column is absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Whether the row carried the given column at all.
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// A validated contact.
///
/// Fields are private; a `Record` cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Record {
    #[serde(rename = "SNo")]
    sno: u64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Company")]
    company: String,
}

impl Record {
    pub fn new(
        sno: u64,
        name: impl Into<String>,
        email: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            sno,
            name: name.into(),
            email: email.into(),
            title: title.into(),
            company: company.into(),
        }
    }

    pub fn sno(&self) -> u64 {
        self.sno
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    /// The contact as a message recipient.
    pub fn recipient(&self) -> Recipient {
        Recipient::new(self.name.clone(), self.email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: u64, pairs: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            position,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn test_numeric_sno_trusted() {
        let r = row(1, &[("SNo", "42"), ("Name", "Ann")]);
        assert_eq!(r.ordinal(), 42);
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_missing_sno_uses_position() {
        let r = row(7, &[("Name", "Ann")]);
        assert_eq!(r.ordinal(), 7);
    }

    #[test]
    fn test_non_numeric_sno_uses_position() {
        let r = row(3, &[("SNo", "three")]);
        assert_eq!(r.ordinal(), 3);
        let r = row(4, &[("SNo", "0")]);
        assert_eq!(r.ordinal(), 4);
        let r = row(5, &[("SNo", "-2")]);
        assert_eq!(r.ordinal(), 5);
    }

    #[test]
    fn test_values_trimmed() {
        let r = row(1, &[("Name", "  Ann  "), ("SNo", " 9 ")]);
        assert_eq!(r.get("Name"), "Ann");
        assert_eq!(r.ordinal(), 9);
    }

    #[test]
    fn test_absent_field_is_empty() {
        let r = row(1, &[("Name", "Ann")]);
        assert_eq!(r.get("Email"), "");
        assert!(!r.has("Email"));
        assert!(r.has("Name"));
    }

    #[test]
    fn test_record_recipient() {
        let rec = Record::new(1, "Ann", "ann@x.com", "Eng", "Acme");
        assert_eq!(rec.recipient().display(), "Ann <ann@x.com>");
    }
}
