//! Probe run configuration

use crate::rule::ValidationRule;
use std::path::PathBuf;
use std::time::Duration;

/// SMTP submission endpoint configuration.
///
/// Credentials are optional: unauthenticated submission to a local
/// relay on port 25 is the common monitoring setup. When a username is
/// given a password must be too (and vice versa); `SmtpSender::connect`
/// rejects half-set credentials.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Upgrade the submission connection with STARTTLS before sending.
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            starttls: false,
            username: None,
            password: None,
        }
    }
}

/// IMAP endpoint holding the destination mailbox.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Mailbox the probe is expected to land in.
    pub mailbox: String,
}

/// Everything one probe run needs: both endpoints, the addresses on
/// the probe, the rule to apply, and the retrieval poll bounds.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub smtp: SmtpConfig,
    pub imap: ImapConfig,
    /// Envelope and `From` header address.
    pub sender: String,
    /// Envelope and `To` header address.
    pub recipient: String,
    pub rule: ValidationRule,
    /// Dump the raw delivered message here before validating.
    pub output: Option<PathBuf>,
    /// Give up waiting for delivery after this much time.
    pub fetch_timeout: Duration,
    /// Pause between mailbox checks while waiting for delivery.
    pub poll_interval: Duration,
}
