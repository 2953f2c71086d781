//! In-process account store for tests and local development.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Account, AccountRepository, CreateOutcome, NewAccount};
use crate::auth::utils::unix_now;

/// `HashMap`-backed repository guarded by a single async mutex.
///
/// Every operation takes and releases the lock within one call, which
/// gives the same read-modify-write atomicity the Postgres store gets
/// from single-statement updates.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Ok(CreateOutcome::DuplicateEmail);
        }

        let now = unix_now();
        let account = Account {
            id: Uuid::new_v4(),
            email: account.email,
            username: account.username,
            password_hash: account.password_hash,
            is_email_verified: account.is_email_verified,
            verification_token: None,
            verification_expires_at: None,
            federated_id: account.federated_id,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(CreateOutcome::Created(account))
    }

    async fn set_verification_challenge(
        &self,
        id: Uuid,
        token: &str,
        expires_at: i64,
    ) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(&id) else {
            bail!("account {id} not found");
        };
        account.verification_token = Some(token.to_string());
        account.verification_expires_at = Some(expires_at);
        account.updated_at = unix_now();
        Ok(())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|account| account.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn clear_verification_and_mark_verified(&self, id: Uuid) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        if account.verification_token.is_none() {
            // Challenge already consumed; the concurrent redeemer lost.
            return Ok(false);
        }
        account.is_email_verified = true;
        account.verification_token = None;
        account.verification_expires_at = None;
        account.updated_at = unix_now();
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
