//! Per-record outcomes and run statistics.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::record::{RawRow, Record, FIELD_COMPANY, FIELD_EMAIL, FIELD_NAME, FIELD_TITLE};

/// Timestamp format used in the run log (sortable, microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Column names of the run log, in order.
pub const LOG_COLUMNS: [&str; 8] = [
    "timestamp", "SNo", "Name", "Email", "Company", "Title", "status", "message",
];

/// Marker written as the message of previewed rows.
pub const PREVIEW_MARKER: &str = "dry-run previewed";

/// Terminal state of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Sent,
    Failed,
    Skipped,
    Previewed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Sent => "sent",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
            Status::Previewed => "previewed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single durable result row for one processed record.
///
/// Field order matches [`LOG_COLUMNS`]; the csv writer relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "SNo")]
    pub sno: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Title")]
    pub title: String,
    pub status: Status,
    pub message: String,
}

impl Outcome {
    /// Outcome for a row that never became a [`Record`].
    pub fn for_row(row: &RawRow, status: Status, message: impl Into<String>) -> Self {
        Self {
            timestamp: now(),
            sno: row.ordinal(),
            name: row.get(FIELD_NAME).to_string(),
            email: row.get(FIELD_EMAIL).to_string(),
            company: row.get(FIELD_COMPANY).to_string(),
            title: row.get(FIELD_TITLE).to_string(),
            status,
            message: message.into(),
        }
    }

    /// Outcome for a validated record.
    pub fn for_record(record: &Record, status: Status, message: impl Into<String>) -> Self {
        Self {
            timestamp: now(),
            sno: record.sno(),
            name: record.name().to_string(),
            email: record.email().to_string(),
            company: record.company().to_string(),
            title: record.title().to_string(),
            status,
            message: message.into(),
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Counts by status for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub previewed: u64,
}

impl RunSummary {
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Sent => self.sent += 1,
            Status::Failed => self.failed += 1,
            Status::Skipped => self.skipped += 1,
            Status::Previewed => self.previewed += 1,
        }
    }

    pub fn count(&self, status: Status) -> u64 {
        match status {
            Status::Sent => self.sent,
            Status::Failed => self.failed,
            Status::Skipped => self.skipped,
            Status::Previewed => self.previewed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(Status::Sent.to_string(), "sent");
        assert_eq!(Status::Previewed.as_str(), "previewed");
    }

    #[test]
    fn test_summary_counts() {
        let mut s = RunSummary::default();
        s.record(Status::Sent);
        s.record(Status::Sent);
        s.record(Status::Skipped);
        assert_eq!(s.total, 3);
        assert_eq!(s.count(Status::Sent), 2);
        assert_eq!(s.count(Status::Skipped), 1);
        assert_eq!(s.count(Status::Failed), 0);
    }

    #[test]
    fn test_outcome_for_short_row() {
        let row = RawRow::new(2, [("Name".to_string(), "Ann".to_string())]);
        let o = Outcome::for_row(&row, Status::Skipped, "missing");
        assert_eq!(o.sno, 2);
        assert_eq!(o.name, "Ann");
        assert_eq!(o.email, "");
    }
}
