//! Verification email delivery abstraction.
//!
//! The auth flows only need "send this token to this address"; how the
//! message leaves the process (SMTP, API, queue) is the sender's
//! concern. Delivery failure is reported to the caller but never rolls
//! back the already-persisted challenge.

use thiserror::Error;
use tracing::info;

/// Returned when a verification message could not be handed off.
#[derive(Debug, Error)]
#[error("verification email delivery failed: {reason}")]
pub struct DeliveryError {
    reason: String,
}

impl DeliveryError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Email delivery abstraction used by the verification flows.
pub trait VerificationSender: Send + Sync {
    /// Deliver a verification token to `address` or report the failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the message could not be sent.
    fn send_verification(&self, address: &str, token: &str) -> Result<(), DeliveryError>;
}

/// Local dev sender that logs the challenge instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogSender;

impl VerificationSender for LogSender {
    fn send_verification(&self, address: &str, token: &str) -> Result<(), DeliveryError> {
        info!(
            address = %address,
            token = %token,
            "verification email send stub"
        );
        Ok(())
    }
}
