//! Row validation: turns a [`RawRow`] into a [`Record`] or a skip reason.

use crate::model::address::is_structurally_valid;
use crate::model::record::{
    RawRow, Record, FIELD_COMPANY, FIELD_EMAIL, FIELD_NAME, FIELD_TITLE, REQUIRED_FIELDS,
};

/// Reason reported for an address that fails the structural check.
pub const INVALID_EMAIL: &str = "invalid email format";

/// Result of validating one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(Record),
    Invalid(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }
}

/// Validate a row.
///
/// Required-field emptiness is checked first and every empty field is listed
/// (`missing required field 'Name'; missing required field 'Title'`). The
/// address check only runs once all required fields are present.
pub fn validate(row: &RawRow) -> ValidationOutcome {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| row.get(f).is_empty())
        .map(|f| format!("missing required field '{f}'"))
        .collect();
    if !missing.is_empty() {
        return ValidationOutcome::Invalid(missing.join("; "));
    }

    let email = row.get(FIELD_EMAIL);
    if !is_structurally_valid(email) {
        return ValidationOutcome::Invalid(INVALID_EMAIL.to_string());
    }

    ValidationOutcome::Valid(Record::new(
        row.ordinal(),
        row.get(FIELD_NAME),
        email,
        row.get(FIELD_TITLE),
        row.get(FIELD_COMPANY),
    ))
}
