//! Bounded retry with exponential backoff.
//!
//! An operation gets `max_retries + 1` attempts. Before attempt `k + 1` the
//! loop sleeps `2^k` seconds (attempt 1 is immediate, then 2s, 4s, 8s, ...).
//! Only errors whose [`IsRetryable::is_retryable`] is true trigger another
//! attempt; anything else is returned at once.

use std::fmt;
use std::time::Duration;

use crate::clock::Clock;
use crate::model::attachment::Attachment;
use crate::model::message::RenderedMessage;

use super::{Transport, TransportError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Classify an error as transient (retry) or permanent (give up).
///
/// Transient failures (network timeouts, connection resets, 4xx replies)
/// return `true`. Permanent failures (bad credentials, rejected recipients)
/// return `false`.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Terminal failure of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// The last error seen.
    pub error: E,
}

impl<E: IsRetryable + fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error.is_retryable() {
            write!(f, "smtp error after {} attempts: {}", self.attempts, self.error)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl<E: IsRetryable + fmt::Display + fmt::Debug> std::error::Error for RetryFailure<E> {}

/// A message that could not be delivered.
pub type DeliveryFailure = RetryFailure<TransportError>;

/// Delay slept before attempt `attempt + 1`, i.e. `2^attempt` seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// attempts. The closure receives the 1-based attempt number.
pub fn with_retry<T, E, F>(
    clock: &dyn Clock,
    max_retries: u32,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    E: IsRetryable + fmt::Display,
{
    let max_attempts = max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match operation(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    "Transient failure, retrying"
                );
                clock.sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt, "Giving up after all attempts");
                } else {
                    tracing::error!(error = %e, attempt, "Non-retryable failure");
                }
                return Err(RetryFailure {
                    attempts: attempt,
                    error: e,
                });
            }
        }
    }
}

/// Deliver one message, retrying transient failures.
///
/// On success returns the server acknowledgment of the final attempt.
pub fn send_with_retry(
    transport: &mut dyn Transport,
    message: &RenderedMessage,
    attachment: &Attachment,
    max_retries: u32,
    clock: &dyn Clock,
) -> Result<String, DeliveryFailure> {
    with_retry(clock, max_retries, |attempt| {
        tracing::debug!(sno = message.sno, attempt, "Sending message");
        transport.send(message, attachment)
    })
}
