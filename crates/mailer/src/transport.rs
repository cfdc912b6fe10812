// Path: crates/mailer/src/transport.rs
//! The SMTP outbound boundary (spec §4.7 step 3), wrapping `lettre` with
//! optional STARTTLS/implicit TLS and the `Deadlines::SMTP_DISPATCH` (30s)
//! deadline (spec §4 "Cancellation & timeouts").

use crate::templates::RenderedEmail;
use ackify_types::config::{Deadlines, MailConfig};
use ackify_types::error::CoreError;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// A single outbound delivery request, assembled by the dispatcher from a
/// claimed [`ackify_types::domain::email::EmailJob`] and its rendered
/// template parts.
pub struct Envelope<'a> {
    pub to: &'a [String],
    pub cc: &'a [String],
    pub bcc: &'a [String],
    pub subject: &'a str,
    pub body: &'a RenderedEmail,
}

pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(config: &MailConfig) -> Result<Self, CoreError> {
        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host))
        }
        .map_err(|e| CoreError::Validation(format!("invalid SMTP host: {e}")))?;

        let builder = builder.port(config.port).timeout(Some(Deadlines::SMTP_DISPATCH));
        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| CoreError::Validation(format!("invalid MAIL_FROM: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Sends `envelope`. A transport-level failure that looks transient
    /// (connection refused, timeout, 4xx/5xx SMTP reply) is surfaced as
    /// [`CoreError::Transient`]; a malformed address is
    /// [`CoreError::Validation`] and the dispatcher treats it as permanent
    /// (spec §4.7 step 6).
    pub async fn send(&self, envelope: Envelope<'_>) -> Result<(), CoreError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(envelope.subject);
        for addr in envelope.to {
            builder = builder.to(parse_mailbox(addr)?);
        }
        for addr in envelope.cc {
            builder = builder.cc(parse_mailbox(addr)?);
        }
        for addr in envelope.bcc {
            builder = builder.bcc(parse_mailbox(addr)?);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(envelope.body.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(envelope.body.html.clone()),
                    ),
            )
            .map_err(|e| CoreError::Validation(format!("malformed message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| CoreError::Transient(format!("SMTP dispatch failed: {e}")))?;
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, CoreError> {
    addr.parse::<Mailbox>()
        .map_err(|e| CoreError::Validation(format!("invalid recipient address {addr}: {e}")))
}
