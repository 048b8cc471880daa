//! Validation rules over the delivered probe
//!
//! Takes the raw bytes the receiver fetched and decides whether the
//! mail path applied the expected trust mechanism. Pure apart from the
//! injected DKIM verifier: no retries, no sockets, no filesystem.

use crate::error::{Error, Result};
use crate::rule::ValidationRule;
use crate::verify::DkimVerifier;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use mailparse::{MailHeaderMap, parse_headers};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// How much older than the current time a selector timestamp may be
/// before the signing key counts as stale.
pub const MAX_SELECTOR_AGE_DAYS: i64 = 30;

/// Timestamp layout of rotation-dated DKIM selectors.
const SELECTOR_FORMAT: &str = "%Y%m%d%H%M%S";

/// Transport-security note an MTA writes into the Received trace when
/// the sending hop was TLS-protected.
static TLS_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"using TLSv[0-9.]+\s+with\s+cipher\s+[A-Za-z0-9_-]+")
        .expect("marker pattern compiles")
});

/// Outcome class of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Success,
    Failure,
}

/// The result of validating one delivered probe message.
///
/// A failed check is a `Verdict`, not an [`enum@Error`]: the mail
/// arrived and was inspected, it just did not satisfy the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub message: String,
}

impl Verdict {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Failure,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, VerdictStatus::Success)
    }

    /// Process exit code this verdict maps to: 0 for success, 2 for a
    /// validation failure. Connection problems exit 1 and never reach
    /// a verdict.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.status {
            VerdictStatus::Success => 0,
            VerdictStatus::Failure => 2,
        }
    }
}

/// Apply `rule` to a raw delivered message.
///
/// # Errors
///
/// Returns an error if the headers cannot be parsed at all, or if the
/// verifier fails operationally. Rule violations are reported as a
/// failure [`Verdict`], not as an error.
pub async fn validate_message(
    raw: &[u8],
    rule: ValidationRule,
    verifier: &dyn DkimVerifier,
) -> Result<Verdict> {
    match rule {
        ValidationRule::Dkim => validate_dkim(raw, verifier).await,
        ValidationRule::Tls => validate_tls(raw),
    }
}

async fn validate_dkim(raw: &[u8], verifier: &dyn DkimVerifier) -> Result<Verdict> {
    let signature = {
        let (headers, _) = parse_headers(raw).map_err(|e| Error::Parse(e.to_string()))?;
        headers.get_first_value("DKIM-Signature")
    };

    let Some(signature) = signature else {
        return Ok(Verdict::failure("No dkim signature found"));
    };

    let Some(selector) = signature_selector(&signature) else {
        return Ok(Verdict::failure("DKIM signature has no selector"));
    };

    let Ok(issued) = NaiveDateTime::parse_from_str(&selector, SELECTOR_FORMAT) else {
        return Ok(Verdict::failure(format!(
            "DKIM selector '{selector}' is not a timestamp"
        )));
    };

    // A selector ahead of the local clock counts as fresh.
    let age = Utc::now().signed_duration_since(issued.and_utc());
    if age > TimeDelta::days(MAX_SELECTOR_AGE_DAYS) {
        return Ok(Verdict::failure(format!(
            "DKIM key older than {MAX_SELECTOR_AGE_DAYS} days"
        )));
    }

    if verifier.verify(raw).await? {
        Ok(Verdict::success(format!(
            "DKIM verification successful, selector is {selector}"
        )))
    } else {
        Ok(Verdict::failure("DKIM verification failed"))
    }
}

fn validate_tls(raw: &[u8]) -> Result<Verdict> {
    let (headers, _) = parse_headers(raw).map_err(|e| Error::Parse(e.to_string()))?;

    for hop in headers.get_all_values("Received") {
        if let Some(marker) = TLS_MARKER.find(&hop) {
            return Ok(Verdict::success(format!(
                "TLS verification successful, mail was sent {}",
                marker.as_str()
            )));
        }
    }

    Ok(Verdict::failure("No TLS log found"))
}

/// Extract the `s=` tag from a DKIM-Signature header value. The first
/// signature header governs the freshness check.
fn signature_selector(signature: &str) -> Option<String> {
    signature.split(';').find_map(|tag| {
        let (key, value) = tag.split_once('=')?;
        (key.trim() == "s").then(|| value.trim().to_string())
    })
}
