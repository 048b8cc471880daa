//! Mail path validation library
//!
//! Sends a probe email through an SMTP endpoint, fetches the delivered
//! copy back out of the destination mailbox over IMAP (STARTTLS with
//! self-signed certificate support), and validates the trace the mail
//! path left in its headers: a fresh, verifying DKIM signature or a
//! TLS transmission log. The [`probe::run`] entry point drives the
//! whole lifecycle; the individual stages are public for callers that
//! want to drive them separately.

mod compose;
mod config;
mod error;
mod imap;
mod rule;
mod smtp;
mod validate;
mod verify;

pub mod probe;

pub use compose::{MessageId, ProbeMessage, local_hostname};
pub use config::{ImapConfig, ProbeConfig, SmtpConfig};
pub use error::{Error, Result};
pub use imap::{DeliveredMessage, ImapReceiver};
pub use rule::ValidationRule;
pub use smtp::SmtpSender;
pub use validate::{MAX_SELECTOR_AGE_DAYS, Verdict, VerdictStatus, validate_message};
pub use verify::{DkimVerifier, DnsDkimVerifier, StaticVerifier};
