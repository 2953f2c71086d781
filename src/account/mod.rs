//! Account records and the repository abstraction they live behind.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// A user identity record, the unit of authentication.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// Absent for accounts that only exist through a federated provider.
    pub password_hash: Option<String>,
    pub is_email_verified: bool,
    /// Live verification challenge; always paired with `verification_expires_at`.
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<i64>,
    pub federated_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields required to create an account; ids and timestamps are
/// assigned by the repository.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub is_email_verified: bool,
    pub federated_id: Option<String>,
}

/// Outcome when attempting to create an account.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    DuplicateEmail,
}

/// Persistence surface consumed by the auth flows.
///
/// `clear_verification_and_mark_verified` is the single transactional
/// boundary for challenge redemption: it only succeeds while a live
/// challenge is present, so two concurrent redemptions cannot both win.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome>;

    /// Store a verification challenge, replacing any prior live one.
    async fn set_verification_challenge(
        &self,
        id: Uuid,
        token: &str,
        expires_at: i64,
    ) -> Result<()>;

    /// Expiry is checked by the caller; this only matches the token.
    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>>;

    /// Atomically consume the live challenge and mark the email verified.
    /// Returns `false` when no live challenge remains (already consumed).
    async fn clear_verification_and_mark_verified(&self, id: Uuid) -> Result<bool>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::{CreateOutcome, NewAccount};

    #[test]
    fn create_outcome_debug_names() {
        let outcome = CreateOutcome::DuplicateEmail;
        assert_eq!(format!("{outcome:?}"), "DuplicateEmail");
    }

    #[test]
    fn new_account_holds_values() {
        let account = NewAccount {
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: Some("$2b$10$hash".to_string()),
            is_email_verified: false,
            federated_id: None,
        };
        assert_eq!(account.email, "alice@example.com");
        assert!(account.federated_id.is_none());
    }
}
