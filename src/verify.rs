//! DKIM cryptographic verification
//!
//! The validator only needs a yes/no answer about the signatures on a
//! delivered message, so the cryptography sits behind the
//! [`DkimVerifier`] trait. Production runs use [`DnsDkimVerifier`]
//! (signature verification against the key published in DNS); tests
//! inject [`StaticVerifier`] to pin the outcome.

use crate::error::{Error, Result};
use async_trait::async_trait;
use mail_auth::{AuthenticatedMessage, DkimResult, Resolver};
use tracing::debug;

/// Yes/no DKIM verification over a raw RFC 5322 message.
#[async_trait]
pub trait DkimVerifier: Send + Sync {
    /// Whether any DKIM signature on the message verifies.
    ///
    /// # Errors
    ///
    /// Returns an error when verification cannot be attempted at all
    /// (unparseable message, resolver setup failure). A signature that
    /// simply does not verify is `Ok(false)`, not an error.
    async fn verify(&self, raw_message: &[u8]) -> Result<bool>;
}

/// DKIM verification against the public key published in DNS.
///
/// Uses the system resolver configuration. The resolver is built per
/// call: one probe run verifies exactly one message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsDkimVerifier;

#[async_trait]
impl DkimVerifier for DnsDkimVerifier {
    async fn verify(&self, raw_message: &[u8]) -> Result<bool> {
        let parsed = AuthenticatedMessage::parse(raw_message)
            .ok_or_else(|| Error::Dkim("Message could not be parsed for verification".into()))?;

        let resolver = Resolver::new_system_conf()
            .map_err(|e| Error::Dkim(format!("DNS resolver setup failed: {e}")))?;

        let results = resolver.verify_dkim(&parsed).await;
        debug!("DKIM verification produced {} result(s)", results.len());

        Ok(results
            .iter()
            .any(|output| matches!(output.result(), DkimResult::Pass)))
    }
}

/// A verifier with a fixed outcome.
///
/// Performs no parsing and no network access. Meant for tests and for
/// exercising the probe plumbing without DNS.
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier(pub bool);

#[async_trait]
impl DkimVerifier for StaticVerifier {
    async fn verify(&self, _raw_message: &[u8]) -> Result<bool> {
        Ok(self.0)
    }
}
