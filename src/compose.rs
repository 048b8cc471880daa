//! Probe message composition
//!
//! Builds the test email that gets pushed through the mail path. The
//! interesting part is the Message-ID: it is generated here, embedded
//! in the headers, and later used verbatim to find the delivered copy
//! in the destination mailbox. Everything else about the message is
//! deliberately plain text/plain content.

use crate::rule::ValidationRule;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence counter mixed into every Message-ID so that ids generated
/// by the same process in the same second stay distinct.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Random per-process base for the sequence, so restarting the tool
/// within one second cannot reproduce an earlier id either.
static ID_BASE: LazyLock<u64> = LazyLock::new(rand::random::<u64>);

/// The unique identifier of one probe message.
///
/// Formatted as `<timestamp>.<pid>.<nonce>@<hostname>` (without the
/// RFC 5322 angle brackets; see [`MessageId::bracketed`] for the
/// header form). The same value travels through the whole probe
/// lifecycle: composed into the headers, returned by the sender, and
/// searched for byte-identically by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh id for the given origin hostname.
    ///
    /// Ids are unique within a process: a random base plus an atomic
    /// counter guarantees no two calls return the same value.
    #[must_use]
    pub fn generate(hostname: &str) -> Self {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let pid = std::process::id();
        let nonce = ID_BASE.wrapping_add(ID_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        Self(format!("{timestamp}.{pid}.{nonce:016x}@{hostname}"))
    }

    /// The bare id, without angle brackets.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as it appears in a `Message-ID` header: `<id>`.
    #[must_use]
    pub fn bracketed(&self) -> String {
        format!("<{}>", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A composed probe email, ready for submission.
///
/// Immutable once built; the sender consumes it during transmission.
#[derive(Debug, Clone)]
pub struct ProbeMessage {
    pub sender: String,
    pub recipient: String,
    pub message_id: MessageId,
    pub subject: String,
    pub body: String,
    pub date: DateTime<Utc>,
}

impl ProbeMessage {
    /// Compose a probe from this host to `recipient`.
    ///
    /// Pure apart from reading the clock and the local hostname: no
    /// network or file access happens here.
    #[must_use]
    pub fn compose(sender: &str, recipient: &str, rule: ValidationRule) -> Self {
        let host = local_hostname();
        let message_id = MessageId::generate(&host);
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            message_id,
            subject: format!("Mail path validation probe ({rule}) from {host}"),
            body: "This is an automated probe message used to validate the \
                   security properties of a mail path. It carries no content \
                   and can be deleted.\r\n"
                .to_string(),
            date: Utc::now(),
        }
    }

    /// Serialize to RFC 5322 bytes: CRLF-terminated headers, a blank
    /// line, then the body.
    #[must_use]
    pub fn to_rfc5322(&self) -> Vec<u8> {
        let raw = format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: {subject}\r\n\
             Date: {date}\r\n\
             Message-ID: {id}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             X-Mailer: mail-validator/{version}\r\n\
             \r\n\
             {body}",
            from = self.sender,
            to = self.recipient,
            subject = self.subject,
            date = self.date.to_rfc2822(),
            id = self.message_id.bracketed(),
            version = env!("CARGO_PKG_VERSION"),
            body = self.body,
        );
        raw.into_bytes()
    }
}

/// The local hostname used in Message-IDs and probe subjects.
#[must_use]
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
