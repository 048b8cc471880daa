//! Probe run orchestration
//!
//! Drives one full probe lifecycle: sanity-check both endpoints, send
//! the probe, poll the mailbox until the copy arrives or the timeout
//! cuts the run off, then hand the raw bytes to the validator. The
//! poll loop lives here and nowhere else; sender, receiver, and
//! validator each do a single attempt of their own step.

use crate::compose::MessageId;
use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::imap::{DeliveredMessage, ImapReceiver};
use crate::smtp::SmtpSender;
use crate::validate::{Verdict, validate_message};
use crate::verify::DkimVerifier;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Run one probe end to end and produce a verdict.
///
/// # Errors
///
/// Returns an error for operational problems: either endpoint
/// unreachable or rejecting credentials, the probe not arriving within
/// the configured timeout, or the output file not being writable. Rule
/// violations come back as a failure [`Verdict`], not an error.
pub async fn run(config: &ProbeConfig, verifier: &dyn DkimVerifier) -> Result<Verdict> {
    // Check the retrieval side first: a bad mailbox or password should
    // surface before a probe is put on the wire.
    let receiver = ImapReceiver::new(config.imap.clone());
    receiver.connect().await?;

    let mut sender = SmtpSender::new(config.smtp.clone());
    sender.connect().await?;

    let id = sender
        .send_test_mail(&config.sender, &config.recipient, config.rule)
        .await?;

    let delivered = wait_for_delivery(
        &receiver,
        &id,
        config.fetch_timeout,
        config.poll_interval,
    )
    .await?;

    if let Some(path) = &config.output {
        tokio::fs::write(path, &delivered.raw).await?;
        info!("Wrote delivered message to {}", path.display());
    }

    validate_message(&delivered.raw, config.rule, verifier).await
}

/// Poll the mailbox until the probe shows up. Always makes at least
/// one attempt; between attempts sleeps `interval`, and once `timeout`
/// has elapsed the probe counts as lost.
async fn wait_for_delivery(
    receiver: &ImapReceiver,
    id: &MessageId,
    timeout: Duration,
    interval: Duration,
) -> Result<DeliveredMessage> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(delivered) = receiver.get_test_message(id).await? {
            return Ok(delivered);
        }
        if Instant::now() >= deadline {
            return Err(Error::NotFound(format!(
                "Probe {id} did not arrive within {timeout:?}"
            )));
        }
        debug!("Probe {} not delivered yet, next check in {:?}", id, interval);
        sleep(interval).await;
    }
}
