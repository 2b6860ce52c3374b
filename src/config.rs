//! Configuration for the signing path.

use chrono::{DateTime, Utc};

/// Signing configuration.
///
/// Controls the fail-open switch and the metadata written into the
/// signature dictionary. Signing is enabled by default; an operator who
/// has not configured a certificate runs with `enabled = false` and every
/// signing call degrades to a skip (see
/// [`SigningOutcome`](crate::signatures::SigningOutcome)).
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Whether signing is enabled at all.
    pub enabled: bool,

    /// Bytes reserved in the document for the DER-encoded signature.
    pub signature_capacity: usize,

    /// Reason for signing, written as `/Reason`.
    pub reason: Option<String>,

    /// Location of signing, written as `/Location`.
    pub location: Option<String>,

    /// Fixed signing time. When unset the wall clock is used.
    pub signing_time: Option<DateTime<Utc>>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self {
            enabled: true,
            // Conservative default for a 2048-bit RSA chain of two.
            signature_capacity: 8192,
            reason: None,
            location: None,
            signing_time: None,
        }
    }

    /// Create a configuration with signing switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Set the reserved signature capacity in bytes.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.signature_capacity = bytes;
        self
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Pin the signing time instead of reading the wall clock.
    pub fn with_signing_time(mut self, at: DateTime<Utc>) -> Self {
        self.signing_time = Some(at);
        self
    }
}
