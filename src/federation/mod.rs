//! Federated identity: external assertions reconciled against local accounts.

use anyhow::anyhow;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::account::{Account, AccountRepository, CreateOutcome, NewAccount};
use crate::auth::utils::normalize_email;
use crate::auth::AuthError;

mod google;

pub use google::GoogleProvider;

/// Scopes requested when building the authorization redirect.
pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Identity attributes the provider vouches for after a code exchange.
#[derive(Clone, Debug)]
pub struct IdentityAssertion {
    /// Provider-scoped stable subject identifier.
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    /// Whether the provider itself has verified the email address.
    pub email_verified: bool,
}

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("token exchange failed")]
    Exchange(#[from] reqwest::Error),
    #[error("identity provider returned status {0}")]
    ProviderStatus(u16),
    #[error("malformed identity assertion")]
    Assertion,
}

/// Exchanges an authorization code with the provider and reconciles the
/// resulting assertion against the local account space.
pub struct GoogleBridge {
    provider: GoogleProvider,
    repository: Arc<dyn AccountRepository>,
}

impl GoogleBridge {
    #[must_use]
    pub fn new(provider: GoogleProvider, repository: Arc<dyn AccountRepository>) -> Self {
        Self {
            provider,
            repository,
        }
    }

    /// URL the caller should redirect to when no code was supplied.
    #[must_use]
    pub fn authorization_url(&self) -> Url {
        self.provider.authorization_url(GOOGLE_SCOPES)
    }

    /// Resolve an authorization code into a local account.
    ///
    /// An existing account with the asserted email is returned unchanged
    /// — federation never rewrites local credentials or verification
    /// state. Otherwise a federation-only account is created: no
    /// password hash, username derived from the assertion, verified flag
    /// copied from the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::FederationFailed`] when the exchange or the
    /// assertion is unusable, or an internal error from the repository.
    pub async fn authenticate(&self, code: &str) -> Result<Account, AuthError> {
        let assertion = match self.provider.exchange_code(code).await {
            Ok(assertion) => assertion,
            Err(err) => {
                error!("Federated code exchange failed: {err}");
                return Err(AuthError::FederationFailed);
            }
        };

        self.reconcile(&assertion).await
    }

    async fn reconcile(&self, assertion: &IdentityAssertion) -> Result<Account, AuthError> {
        let email = normalize_email(&assertion.email);
        if let Some(existing) = self.repository.find_by_email(&email).await? {
            return Ok(existing);
        }

        let username = derive_username(assertion.name.as_deref(), &email);
        let outcome = self
            .repository
            .create(NewAccount {
                email: email.clone(),
                username,
                // Federation-only accounts carry no password hash; they
                // are never password-loginable until one is set.
                password_hash: None,
                is_email_verified: assertion.email_verified,
                federated_id: Some(assertion.subject.clone()),
            })
            .await?;

        match outcome {
            CreateOutcome::Created(account) => {
                info!(email = %account.email, "created account from federated identity");
                Ok(account)
            }
            CreateOutcome::DuplicateEmail => {
                // Lost a race against a concurrent signup; the existing
                // record wins, per the no-overwrite rule.
                self.repository
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AuthError::Internal(anyhow!("account vanished after conflict")))
            }
        }
    }
}

fn derive_username(name: Option<&str>, email: &str) -> String {
    if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    email.split('@').next().unwrap_or_default().to_string()
}
