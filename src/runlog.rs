//! Append-only CSV run log.
//!
//! One row per processed record, columns in [`LOG_COLUMNS`] order. The header
//! is written only when the file is new or empty, so repeated runs keep
//! appending to the same file. Each row is flushed before the next record is
//! processed; a crash loses at most the row being written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, SubsecRound};
use tracing::{debug, info};

use crate::error::{MailcastError, Result};
use crate::model::outcome::{Outcome, RunSummary, LOG_COLUMNS};

/// Writer for the durable run log.
pub struct RunLogger<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    last_timestamp: Option<NaiveDateTime>,
    summary: RunSummary,
}

impl RunLogger<File> {
    /// Open `path` for appending, creating it (with a header row) if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let needs_header = std::fs::metadata(path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MailcastError::io(path, e))?;

        info!(path = %path.display(), new_file = needs_header, "Opened run log");
        let mut logger = Self::from_writer(file, needs_header)?;
        logger.path = path.to_path_buf();
        Ok(logger)
    }
}

impl<W: Write> RunLogger<W> {
    /// Wrap any sink. `write_header` controls whether the column row goes
    /// out first.
    pub fn from_writer(sink: W, write_header: bool) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        let mut logger = Self {
            writer,
            path: PathBuf::from("<run log>"),
            last_timestamp: None,
            summary: RunSummary::default(),
        };
        if write_header {
            logger.writer.write_record(LOG_COLUMNS)?;
            logger.flush()?;
        }
        Ok(logger)
    }

    /// Append one outcome and flush it to the sink, returning the row as
    /// written.
    ///
    /// Timestamps are forced to increase strictly within a run: a clock that
    /// stalls or steps back yields `last + 1µs`.
    pub fn append(&mut self, mut outcome: Outcome) -> Result<Outcome> {
        outcome.timestamp = outcome.timestamp.trunc_subsecs(6);
        if let Some(last) = self.last_timestamp {
            if outcome.timestamp <= last {
                outcome.timestamp = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(outcome.timestamp);

        self.writer.serialize(&outcome)?;
        self.flush()?;
        self.summary.record(outcome.status);
        debug!(sno = outcome.sno, status = %outcome.status, "Logged outcome");
        Ok(outcome)
    }

    /// Counts of everything appended through this logger.
    pub fn summarize(&self) -> RunSummary {
        self.summary
    }

    /// The underlying sink.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| MailcastError::io(&self.path, e))
    }
}
