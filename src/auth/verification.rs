//! Single-use email verification challenges.

use thiserror::Error;
use tracing::error;

use super::utils::{generate_verification_token, unix_now};
use crate::account::{Account, AccountRepository};
use crate::email::VerificationSender;

const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("verification token not found")]
    NotFound,
    #[error("verification token expired")]
    Expired,
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Result of issuing a challenge. The raw token is only sent to the
/// account's email address, never returned to the API caller.
#[derive(Debug)]
pub struct ChallengeIssued {
    /// Whether the notification actually went out. The challenge is
    /// durable either way; a failed send only degrades the response.
    pub delivered: bool,
}

/// Issues and redeems verification challenges against the repository.
///
/// At most one challenge is live per account: issuing a new one
/// overwrites the previous token, and redemption consumes the token
/// atomically so it can never be replayed.
#[derive(Clone, Copy, Debug)]
pub struct ChallengeIssuer {
    ttl_seconds: i64,
}

impl ChallengeIssuer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl_seconds: DEFAULT_CHALLENGE_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Generate, persist, and send a fresh challenge for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error when token generation or persistence fails.
    /// Delivery failure is not an error: the challenge is already
    /// stored, so the outcome reports `delivered: false` instead.
    pub async fn issue(
        &self,
        repository: &dyn AccountRepository,
        sender: &dyn VerificationSender,
        account: &Account,
    ) -> Result<ChallengeIssued, ChallengeError> {
        let token = generate_verification_token()?;
        let expires_at = unix_now() + self.ttl_seconds;
        repository
            .set_verification_challenge(account.id, &token, expires_at)
            .await?;

        let delivered = match sender.send_verification(&account.email, &token) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to deliver verification email: {err}");
                false
            }
        };

        Ok(ChallengeIssued { delivered })
    }

    /// Redeem a challenge token, marking the account verified.
    ///
    /// Expired tokens are left in place; only a fresh issuance replaces
    /// them. A token that loses a concurrent redemption race reports
    /// [`ChallengeError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::NotFound`] when no account holds the
    /// token, [`ChallengeError::Expired`] when its expiry has passed,
    /// or a repository error.
    pub async fn redeem(
        &self,
        repository: &dyn AccountRepository,
        token: &str,
    ) -> Result<Account, ChallengeError> {
        let Some(mut account) = repository.find_by_verification_token(token).await? else {
            return Err(ChallengeError::NotFound);
        };

        let expires_at = account.verification_expires_at.unwrap_or(0);
        if expires_at <= unix_now() {
            return Err(ChallengeError::Expired);
        }

        let consumed = repository
            .clear_verification_and_mark_verified(account.id)
            .await?;
        if !consumed {
            return Err(ChallengeError::NotFound);
        }

        account.is_email_verified = true;
        account.verification_token = None;
        account.verification_expires_at = None;
        Ok(account)
    }
}

impl Default for ChallengeIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{CreateOutcome, MemoryRepository, NewAccount};
    use crate::email::{DeliveryError, LogSender};
    use anyhow::{bail, Context, Result};
    use std::sync::Mutex;

    /// Captures outbound messages so tests can redeem real tokens.
    struct RecordingSender {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }

        fn last_token(&self) -> Option<String> {
            self.messages
                .lock()
                .ok()?
                .last()
                .map(|(_, token)| token.clone())
        }
    }

    impl VerificationSender for RecordingSender {
        fn send_verification(&self, address: &str, token: &str) -> Result<(), DeliveryError> {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push((address.to_string(), token.to_string()));
            }
            Ok(())
        }
    }

    struct FailingSender;

    impl VerificationSender for FailingSender {
        fn send_verification(&self, _address: &str, _token: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::new("smtp unavailable"))
        }
    }

    async fn create_account(repository: &MemoryRepository) -> Result<crate::account::Account> {
        let outcome = repository
            .create(NewAccount {
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
                password_hash: Some("$2b$10$hash".to_string()),
                is_email_verified: false,
                federated_id: None,
            })
            .await?;
        match outcome {
            CreateOutcome::Created(account) => Ok(account),
            CreateOutcome::DuplicateEmail => bail!("unexpected duplicate"),
        }
    }

    #[tokio::test]
    async fn issue_then_redeem_marks_verified() -> Result<()> {
        let repository = MemoryRepository::new();
        let sender = RecordingSender::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        let issued = challenges.issue(&repository, &sender, &account).await?;
        assert!(issued.delivered);

        let token = sender.last_token().context("no message recorded")?;
        let redeemed = challenges.redeem(&repository, &token).await?;
        assert!(redeemed.is_email_verified);
        assert!(redeemed.verification_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn second_redemption_fails() -> Result<()> {
        let repository = MemoryRepository::new();
        let sender = RecordingSender::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        challenges.issue(&repository, &sender, &account).await?;
        let token = sender.last_token().context("no message recorded")?;

        challenges.redeem(&repository, &token).await?;
        let result = challenges.redeem(&repository, &token).await;
        assert!(matches!(result, Err(ChallengeError::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_token() -> Result<()> {
        let repository = MemoryRepository::new();
        let sender = RecordingSender::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        challenges.issue(&repository, &sender, &account).await?;
        let first = sender.last_token().context("no message recorded")?;
        challenges.issue(&repository, &sender, &account).await?;

        let result = challenges.redeem(&repository, &first).await;
        assert!(matches!(result, Err(ChallengeError::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_left_in_place() -> Result<()> {
        let repository = MemoryRepository::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        // Store a challenge whose expiry is already in the past.
        repository
            .set_verification_challenge(account.id, "stale", unix_now() - 1)
            .await?;

        let result = challenges.redeem(&repository, "stale").await;
        assert!(matches!(result, Err(ChallengeError::Expired)));

        // The token stays until a fresh issuance replaces it.
        let account = repository
            .find_by_id(account.id)
            .await?
            .context("missing account")?;
        assert_eq!(account.verification_token.as_deref(), Some("stale"));
        assert!(!account.is_email_verified);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let repository = MemoryRepository::new();
        let challenges = ChallengeIssuer::new();
        let result = challenges.redeem(&repository, "missing").await;
        assert!(matches!(result, Err(ChallengeError::NotFound)));
    }

    #[tokio::test]
    async fn delivery_failure_still_issues_challenge() -> Result<()> {
        let repository = MemoryRepository::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        let issued = challenges
            .issue(&repository, &FailingSender, &account)
            .await?;
        assert!(!issued.delivered);

        // The challenge was persisted despite the failed send.
        let account = repository
            .find_by_id(account.id)
            .await?
            .context("missing account")?;
        assert!(account.verification_token.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn log_sender_reports_delivered() -> Result<()> {
        let repository = MemoryRepository::new();
        let challenges = ChallengeIssuer::new();
        let account = create_account(&repository).await?;

        let issued = challenges.issue(&repository, &LogSender, &account).await?;
        assert!(issued.delivered);
        Ok(())
    }
}
