//! Minimum-interval rate limiting between sends.
//!
//! At `N` emails per minute, successive [`RateLimiter::wait`] returns are at
//! least `60 / N` seconds apart. The first wait never blocks.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::error::{MailcastError, Result};

/// Default sending rate.
pub const DEFAULT_EMAILS_PER_MINUTE: f64 = 20.0;

/// Enforces a fixed minimum spacing between sends.
pub struct RateLimiter {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last: Option<Duration>,
}

impl RateLimiter {
    /// Create a limiter for `emails_per_minute`.
    ///
    /// Zero, negative, NaN and infinite rates are configuration errors, and
    /// so are rates too small to give a representable interval.
    pub fn new(emails_per_minute: f64, clock: Arc<dyn Clock>) -> Result<Self> {
        let interval = interval_for(emails_per_minute)?;
        debug!(
            emails_per_minute,
            interval_secs = interval.as_secs_f64(),
            "Configured rate limiter"
        );
        Ok(Self {
            interval,
            clock,
            last: None,
        })
    }

    /// Minimum spacing between sends.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the interval since the previous `wait` has elapsed.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = self.clock.now().saturating_sub(last);
            let remaining = self.interval.saturating_sub(elapsed);
            if !remaining.is_zero() {
                debug!(wait_ms = remaining.as_millis() as u64, "Rate limiting");
                self.clock.sleep(remaining);
            }
        }
        self.last = Some(self.clock.now());
    }
}

/// Spacing between sends for a rate in emails per minute.
pub fn interval_for(emails_per_minute: f64) -> Result<Duration> {
    if !emails_per_minute.is_finite() || emails_per_minute <= 0.0 {
        return Err(MailcastError::config(format!(
            "emails per minute must be a positive number, got {emails_per_minute}"
        )));
    }
    Duration::try_from_secs_f64(60.0 / emails_per_minute).map_err(|e| {
        MailcastError::config(format!(
            "emails per minute {emails_per_minute} gives an unusable send interval: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_first_wait_never_blocks() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::new(20.0, clock.clone()).unwrap();
        limiter.wait();
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_consecutive_waits_spaced() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::new(20.0, clock.clone()).unwrap();
        limiter.wait();
        let first = clock.now();
        limiter.wait();
        let second = clock.now();
        assert!(second - first >= Duration::from_secs(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }

    #[test]
    fn test_elapsed_work_counts_toward_interval() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = RateLimiter::new(20.0, clock.clone()).unwrap();
        limiter.wait();
        clock.advance(Duration::from_secs(1));
        limiter.wait();
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);

        clock.advance(Duration::from_secs(10));
        limiter.wait();
        assert_eq!(clock.sleeps().len(), 1, "no wait needed after a long gap");
    }

    #[test]
    fn test_interval_for() {
        assert_eq!(interval_for(60.0).unwrap(), Duration::from_secs(1));
        assert_eq!(interval_for(0.5).unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-300, f64::MIN_POSITIVE / 4.0] {
            assert!(
                matches!(interval_for(rate), Err(MailcastError::Config(_))),
                "{rate}"
            );
        }
    }
}
