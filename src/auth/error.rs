//! Typed failures returned by the auth flows.

use thiserror::Error;

/// Every expected failure is a value; the boundary layer maps each kind
/// to a stable status code without leaking internals.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account already exists")]
    AccountAlreadyExists,
    #[error("account not found")]
    AccountNotFound,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid or expired verification token")]
    InvalidVerificationToken,
    #[error("federated authentication failed")]
    FederationFailed,
    /// A stored password hash that can no longer be parsed. Treated as
    /// fatal for that record, never as a bad-password response.
    #[error("corrupt stored credential")]
    CorruptCredential,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
