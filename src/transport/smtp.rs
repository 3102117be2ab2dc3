//! SMTP submission through `lettre`.
//!
//! One [`SmtpSession`] is opened per live run: it authenticates up front and
//! is then reused for every record. Messages are `multipart/mixed` with a
//! `multipart/alternative` (plain text + HTML) body and the run attachment.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Address, Message, SmtpTransport, Transport as _};
use tracing::{debug, info};

use crate::config::{Credentials, Security, SmtpConfig};
use crate::model::attachment::Attachment;
use crate::model::message::RenderedMessage;

use super::{Transport, TransportError};

/// Reply codes that mean the credentials were refused.
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// An authenticated connection to a submission server.
pub struct SmtpSession {
    transport: SmtpTransport,
    from: Mailbox,
    composed: Option<(RenderedMessage, Message)>,
}

impl SmtpSession {
    /// Build the transport and verify that the server accepts the credentials.
    ///
    /// Fails with [`TransportError::Authentication`] on refused credentials
    /// and [`TransportError::Connection`] when the server cannot be reached.
    pub fn connect(
        config: &SmtpConfig,
        credentials: &Credentials,
        sender_name: Option<&str>,
    ) -> Result<Self, TransportError> {
        let from = sender_mailbox(&credentials.user, sender_name)?;

        let builder = match config.security {
            Security::StartTls => SmtpTransport::starttls_relay(&config.host),
            Security::Tls => SmtpTransport::relay(&config.host),
            Security::None => Ok(SmtpTransport::builder_dangerous(&config.host)),
        }
        .map_err(|e| classify(&e))?;

        let transport = builder
            .port(config.port)
            .credentials(SmtpCredentials::new(
                credentials.user.clone(),
                credentials.secret().to_string(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        info!(host = %config.host, port = config.port, security = ?config.security, "Connecting to SMTP server");
        match transport.test_connection() {
            Ok(true) => {}
            Ok(false) => {
                return Err(TransportError::Connection(format!(
                    "{}:{} did not answer",
                    config.host, config.port
                )))
            }
            Err(e) => return Err(classify(&e)),
        }
        info!(user = %credentials.user, "SMTP session authenticated");

        Ok(Self {
            transport,
            from,
            composed: None,
        })
    }

    /// The `From:` mailbox used for every message of the run.
    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Compose `message`, reusing the previous result when the same message
    /// is sent again (retries).
    fn composed(
        &mut self,
        message: &RenderedMessage,
        attachment: &Attachment,
    ) -> Result<&Message, TransportError> {
        let reuse = matches!(&self.composed, Some((cached, _)) if cached == message);
        if !reuse {
            let email = compose(&self.from, message, attachment)?;
            self.composed = Some((message.clone(), email));
        }
        match &self.composed {
            Some((_, email)) => Ok(email),
            None => Err(TransportError::Compose("message cache empty".to_string())),
        }
    }
}

impl Transport for SmtpSession {
    fn send(
        &mut self,
        message: &RenderedMessage,
        attachment: &Attachment,
    ) -> Result<String, TransportError> {
        let email = self.composed(message, attachment)?.clone();
        let response = self.transport.send(&email).map_err(|e| classify(&e))?;
        let text = response
            .message()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let ack = format!("{} {}", response.code(), text).trim_end().to_string();
        debug!(sno = message.sno, response = %ack, "Server accepted message");
        Ok(ack)
    }
}

/// Build the MIME message for one recipient.
pub fn compose(
    from: &Mailbox,
    message: &RenderedMessage,
    attachment: &Attachment,
) -> Result<Message, TransportError> {
    let address: Address = message.recipient.address.parse().map_err(|e| {
        TransportError::Compose(format!(
            "invalid recipient '{}': {e}",
            message.recipient.address
        ))
    })?;
    let name = (!message.recipient.display_name.is_empty())
        .then(|| message.recipient.display_name.clone());

    let content_type = ContentType::parse(&attachment.content_type).map_err(|_| {
        TransportError::Compose(format!(
            "invalid content type '{}'",
            attachment.content_type
        ))
    })?;

    let body = MultiPart::alternative_plain_html(message.body.clone(), message.html_body());
    let file = AttachmentPart::new(attachment.filename.clone())
        .body(attachment.data.clone(), content_type);

    Message::builder()
        .from(from.clone())
        .to(Mailbox::new(name, address))
        .subject(message.subject.clone())
        .multipart(MultiPart::mixed().multipart(body).singlepart(file))
        .map_err(|e| TransportError::Compose(e.to_string()))
}

/// The sender mailbox: the submission identity with an optional display name.
pub fn sender_mailbox(user: &str, display_name: Option<&str>) -> Result<Mailbox, TransportError> {
    let address: Address = user
        .parse()
        .map_err(|e| TransportError::Compose(format!("invalid sender address '{user}': {e}")))?;
    let name = display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Ok(Mailbox::new(name, address))
}

/// Map a `lettre` SMTP error onto the retry taxonomy.
fn classify(err: &lettre::transport::smtp::Error) -> TransportError {
    let detail = err.to_string();

    if let Some(code) = err.status() {
        if AUTH_FAILURE_CODES.contains(&code.to_string().as_str()) {
            return TransportError::Authentication(detail);
        }
    }

    if err.is_permanent() || err.is_client() || err.is_response() {
        TransportError::Permanent(detail)
    } else if err.is_transient() || err.is_timeout() {
        TransportError::Transient(detail)
    } else {
        TransportError::Connection(detail)
    }
}
