//! SMTP probe submission

use crate::compose::{MessageId, ProbeMessage};
use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::rule::ValidationRule;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound on any single SMTP exchange.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Submits probe messages to the SMTP endpoint under test.
///
/// The transport is acquired by [`SmtpSender::connect`] and held for
/// the lifetime of the sender, so a refused or misconfigured endpoint
/// surfaces before a probe is composed and sent.
pub struct SmtpSender {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpSender {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Build the transport and verify the endpoint answers an EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable, rejects the
    /// connection, or if credentials are only half-configured.
    pub async fn connect(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("Connecting to SMTP server at {}", addr);

        let mut builder = if self.config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| Error::Tls(format!("STARTTLS setup failed: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
        }
        .port(self.config.port);

        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                builder =
                    builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "SMTP username and password must be set together".into(),
                ));
            }
        }

        let transport = builder.timeout(Some(SEND_TIMEOUT)).build();

        let accepted = transport
            .test_connection()
            .await
            .map_err(|e| Error::Smtp(format!("Connection to {addr} failed: {e}")))?;
        if !accepted {
            return Err(Error::Smtp(format!(
                "Server at {addr} did not accept the connection"
            )));
        }

        info!("Connected to SMTP server at {}", addr);
        self.transport = Some(transport);
        Ok(())
    }

    /// Compose a probe for this run and transmit it, handing back the
    /// Message-ID the receiver later searches the mailbox with.
    ///
    /// # Errors
    ///
    /// Returns an error if [`SmtpSender::connect`] has not been called,
    /// if an address does not parse, or if the server rejects the
    /// message.
    pub async fn send_test_mail(
        &self,
        sender: &str,
        recipient: &str,
        rule: ValidationRule,
    ) -> Result<MessageId> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| Error::Smtp("Not connected (call connect first)".into()))?;

        let probe = ProbeMessage::compose(sender, recipient, rule);
        let envelope = build_envelope(&probe)?;

        debug!("Sending probe {}", probe.message_id);
        transport
            .send_raw(&envelope, &probe.to_rfc5322())
            .await
            .map_err(|e| Error::Smtp(format!("Send failed: {e}")))?;

        info!("Probe {} accepted for delivery", probe.message_id);
        Ok(probe.message_id)
    }
}

fn build_envelope(probe: &ProbeMessage) -> Result<Envelope> {
    let from = probe
        .sender
        .parse::<Address>()
        .map_err(|e| Error::Config(format!("Invalid sender address '{}': {e}", probe.sender)))?;
    let to = probe.recipient.parse::<Address>().map_err(|e| {
        Error::Config(format!(
            "Invalid recipient address '{}': {e}",
            probe.recipient
        ))
    })?;
    Envelope::new(Some(from), vec![to]).map_err(|e| Error::Smtp(e.to_string()))
}
