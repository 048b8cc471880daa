//! Validation rule types
//!
//! Provides a strongly-typed enum for the supported validation rules
//! instead of raw strings. The rule decides which headers of the
//! delivered probe are inspected and which checks run against them.

use crate::error::Error;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A validation rule applied to the delivered probe message.
///
/// # Examples
///
/// ```
/// use mail_validator::ValidationRule;
///
/// let rule: ValidationRule = "dkim".parse().unwrap();
/// assert_eq!(rule, ValidationRule::Dkim);
/// assert_eq!(rule.as_str(), "dkim");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationRule {
    /// Check the DKIM signature and the freshness of its selector.
    Dkim,
    /// Check the Received trace for a TLS transmission log.
    Tls,
}

impl ValidationRule {
    /// The rule name as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dkim => "dkim",
            Self::Tls => "tls",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("dkim") {
            Ok(Self::Dkim)
        } else if s.eq_ignore_ascii_case("tls") {
            Ok(Self::Tls)
        } else {
            Err(Error::Config(format!(
                "Unknown validation rule '{s}' (expected 'dkim' or 'tls')"
            )))
        }
    }
}
