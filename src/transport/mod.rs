//! Message delivery.
//!
//! [`Transport`] is the seam between the campaign loop and the wire: the real
//! implementation is [`smtp::SmtpSession`], tests plug in scripted doubles.
//! Failures are classified as retryable or not by [`retry::IsRetryable`], and
//! [`retry::send_with_retry`] drives the bounded backoff loop.

pub mod retry;
pub mod smtp;

use thiserror::Error;

use crate::model::attachment::Attachment;
use crate::model::message::RenderedMessage;

pub use retry::{send_with_retry, DeliveryFailure, IsRetryable};

/// Delivery failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Could not reach the server, or the connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// Temporary rejection (4xx) or timeout; worth another attempt.
    #[error("temporary failure: {0}")]
    Transient(String),

    /// Permanent rejection (5xx), e.g. an unknown recipient.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// The message could not be built (bad address, bad content type).
    #[error("could not compose message: {0}")]
    Compose(String),
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connection(_) | TransportError::Transient(_)
        )
    }
}

/// Something that can hand one message to a mail server.
pub trait Transport {
    /// Submit `message` with `attachment`.
    ///
    /// Returns the server's acknowledgment text on success.
    fn send(
        &mut self,
        message: &RenderedMessage,
        attachment: &Attachment,
    ) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &mut self,
        message: &RenderedMessage,
        attachment: &Attachment,
    ) -> Result<String, TransportError> {
        (**self).send(message, attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(TransportError::Connection("reset".into()).is_retryable());
        assert!(TransportError::Transient("421".into()).is_retryable());
        assert!(!TransportError::Authentication("535".into()).is_retryable());
        assert!(!TransportError::Permanent("550".into()).is_retryable());
        assert!(!TransportError::Compose("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_display_keeps_detail() {
        let e = TransportError::Permanent("550 5.1.1 user unknown".into());
        assert_eq!(e.to_string(), "permanent failure: 550 5.1.1 user unknown");
    }
}
