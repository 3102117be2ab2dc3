//! The campaign loop.
//!
//! Each row goes through `validate -> render -> deliver -> log`, fully, before
//! the next row is read. Every row yields exactly one [`Outcome`] in the run
//! log, whatever happens to it. Only run-level problems (a log write that
//! fails) stop the loop.

use std::io::Write;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::message::RenderedMessage;
use crate::model::outcome::{Outcome, RunSummary, Status, PREVIEW_MARKER};
use crate::model::record::RawRow;
use crate::rate_limit::RateLimiter;
use crate::runlog::RunLogger;
use crate::template::Template;
use crate::transport::{send_with_retry, Transport};
use crate::validate::{validate, ValidationOutcome};

/// Characters of the body shown in a preview block.
pub const PREVIEW_BODY_CHARS: usize = 1000;

/// Everything a live run needs beyond the template: the open session and
/// the pacing state shared across records.
pub struct LiveDelivery {
    transport: Box<dyn Transport>,
    limiter: RateLimiter,
    max_retries: u32,
    clock: Arc<dyn Clock>,
}

impl LiveDelivery {
    pub fn new(
        transport: Box<dyn Transport>,
        limiter: RateLimiter,
        max_retries: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            limiter,
            max_retries,
            clock,
        }
    }
}

/// Whether messages are actually handed to a transport.
pub enum Mode {
    /// Render and log only. No transport, no rate limiting.
    Preview,
    /// Rate-limit and deliver through the session.
    Live(LiveDelivery),
}

impl Mode {
    pub fn is_live(&self) -> bool {
        matches!(self, Mode::Live(_))
    }
}

/// Run context for one campaign.
pub struct Campaign<W: Write> {
    template: Template,
    attachment: Attachment,
    logger: RunLogger<W>,
    mode: Mode,
}

impl<W: Write> Campaign<W> {
    pub fn new(template: Template, attachment: Attachment, logger: RunLogger<W>, mode: Mode) -> Self {
        Self {
            template,
            attachment,
            logger,
            mode,
        }
    }

    /// Process every row in order.
    ///
    /// `progress` is called after each row's outcome has been logged.
    pub fn run<I>(&mut self, rows: I, progress: Option<&dyn Fn(&Outcome)>) -> Result<RunSummary>
    where
        I: IntoIterator<Item = RawRow>,
    {
        info!(live = self.mode.is_live(), "Starting campaign");
        for row in rows {
            let outcome = self.process(row)?;
            if let Some(cb) = progress {
                cb(&outcome);
            }
        }
        let summary = self.logger.summarize();
        info!(
            total = summary.total,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            previewed = summary.previewed,
            "Campaign finished"
        );
        Ok(summary)
    }

    /// Take one row to its terminal state and log it.
    pub fn process(&mut self, row: RawRow) -> Result<Outcome> {
        let record = match validate(&row) {
            ValidationOutcome::Valid(record) => record,
            ValidationOutcome::Invalid(reason) => {
                warn!(sno = row.ordinal(), reason = %reason, "Skipping row");
                return self.log(Outcome::for_row(&row, Status::Skipped, reason));
            }
        };

        let message = self.template.render_message(&record, &self.attachment.path);

        let outcome = match &mut self.mode {
            Mode::Preview => {
                log_preview(&message, &self.attachment);
                Outcome::for_record(&record, Status::Previewed, PREVIEW_MARKER)
            }
            Mode::Live(live) => {
                live.limiter.wait();
                match send_with_retry(
                    live.transport.as_mut(),
                    &message,
                    &self.attachment,
                    live.max_retries,
                    live.clock.as_ref(),
                ) {
                    Ok(ack) => {
                        info!(sno = record.sno(), email = %record.email(), "Sent");
                        Outcome::for_record(&record, Status::Sent, ack)
                    }
                    Err(failure) => {
                        error!(
                            sno = record.sno(),
                            email = %record.email(),
                            attempts = failure.attempts,
                            error = %failure.error,
                            "Delivery failed"
                        );
                        Outcome::for_record(&record, Status::Failed, failure.to_string())
                    }
                }
            }
        };
        self.log(outcome)
    }

    /// Counts so far.
    pub fn summary(&self) -> RunSummary {
        self.logger.summarize()
    }

    /// Give back the log sink.
    pub fn into_logger(self) -> RunLogger<W> {
        self.logger
    }

    fn log(&mut self, outcome: Outcome) -> Result<Outcome> {
        self.logger.append(outcome)
    }
}

/// Body shortened to [`PREVIEW_BODY_CHARS`] characters, with `...` when cut.
pub fn preview_body(body: &str) -> String {
    match body.char_indices().nth(PREVIEW_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn log_preview(message: &RenderedMessage, attachment: &Attachment) {
    info!(
        sno = message.sno,
        to = %message.recipient,
        subject = %message.subject,
        attachment = %attachment.filename,
        "Preview\n{}",
        preview_body(&message.body)
    );
}
