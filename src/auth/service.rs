//! Orchestration of register/login/refresh/verify intents.

use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::error::AuthError;
use super::password::PasswordHasher;
use super::tokens::{TokenError, TokenIssuer, TokenKind};
use super::utils::normalize_email;
use super::verification::{ChallengeError, ChallengeIssuer};
use crate::account::{Account, AccountRepository, CreateOutcome, NewAccount};
use crate::email::VerificationSender;
use crate::federation::GoogleBridge;

/// Access/refresh pair returned on successful authentication.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of a registration intent. Both variants mean a verification
/// challenge is live; neither returns credentials.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// A new unverified account was created and a challenge issued.
    Created { delivered: bool },
    /// The email was already registered but unverified; the challenge
    /// was re-issued instead of failing.
    ChallengeResent { delivered: bool },
}

/// Outcome of a login intent.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(TokenPair),
    /// The account exists but its email is unverified: a fresh challenge
    /// goes out and no credentials are returned, password or not.
    VerificationRequired { delivered: bool },
}

/// Outcome of a federated login intent.
#[derive(Debug)]
pub enum FederatedOutcome {
    /// No authorization code was supplied; the caller should redirect.
    AuthorizeRedirect(Url),
    Authenticated {
        account: Account,
        tokens: TokenPair,
    },
    /// The provider did not vouch for the email; the account exists but
    /// needs verification like any direct login.
    VerificationRequired { delivered: bool },
}

/// Drives every credential flow over its injected collaborators.
pub struct AuthService {
    repository: Arc<dyn AccountRepository>,
    sender: Arc<dyn VerificationSender>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    challenges: ChallengeIssuer,
    bridge: Option<GoogleBridge>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        sender: Arc<dyn VerificationSender>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        challenges: ChallengeIssuer,
    ) -> Self {
        Self {
            repository,
            sender,
            hasher,
            tokens,
            challenges,
            bridge: None,
        }
    }

    /// Attach a federated identity bridge.
    #[must_use]
    pub fn with_bridge(mut self, bridge: GoogleBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Register a new account and issue its verification challenge.
    ///
    /// Registering an email that already exists unverified re-issues the
    /// challenge (idempotent resend); a verified email is a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountAlreadyExists`] for a verified email,
    /// or an internal error from the collaborators.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome, AuthError> {
        let email = normalize_email(email);

        if let Some(existing) = self.repository.find_by_email(&email).await? {
            if !existing.is_email_verified {
                debug!(email = %email, "re-issuing challenge for unverified registration");
                let issued = self.issue_challenge(&existing).await?;
                return Ok(RegisterOutcome::ChallengeResent {
                    delivered: issued.delivered,
                });
            }
            return Err(AuthError::AccountAlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let outcome = self
            .repository
            .create(NewAccount {
                email,
                username: username.to_string(),
                password_hash: Some(password_hash),
                is_email_verified: false,
                federated_id: None,
            })
            .await?;
        let account = match outcome {
            CreateOutcome::Created(account) => account,
            // Lost a race against a concurrent registration.
            CreateOutcome::DuplicateEmail => return Err(AuthError::AccountAlreadyExists),
        };

        info!(email = %account.email, "registered account");
        let issued = self.issue_challenge(&account).await?;
        Ok(RegisterOutcome::Created {
            delivered: issued.delivered,
        })
    }

    /// Authenticate with email and password.
    ///
    /// An unverified account never yields tokens: the challenge is
    /// re-issued instead, whatever the password was.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email,
    /// a missing password hash (federation-only account), or a wrong
    /// password; [`AuthError::CorruptCredential`] for an unparseable
    /// stored hash.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.repository.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !account.is_email_verified {
            debug!(email = %email, "login on unverified account, re-issuing challenge");
            let issued = self.issue_challenge(&account).await?;
            return Ok(LoginOutcome::VerificationRequired {
                delivered: issued.delivered,
            });
        }

        let Some(hash) = account.password_hash.as_deref() else {
            // Federation-only account: no password can ever match.
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.verify(password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(LoginOutcome::Authenticated(self.issue_pair(account.id)?))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// Refresh tokens are not rotated on use; the presented token stays
    /// valid until its own expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] for an expired refresh token,
    /// [`AuthError::InvalidToken`] for anything else unverifiable, and
    /// [`AuthError::AccountNotFound`] when the subject no longer exists.
    pub async fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let subject = self
            .tokens
            .validate(token, TokenKind::Refresh)
            .map_err(map_token_error)?;

        let Some(account) = self.repository.find_by_id(subject).await? else {
            return Err(AuthError::AccountNotFound);
        };

        self.tokens
            .issue_access(account.id)
            .map_err(|err| AuthError::Internal(err.into()))
    }

    /// Redeem a verification challenge token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidVerificationToken`] for an unknown or
    /// expired token (indistinguishable to the caller).
    pub async fn verify_email(&self, token: &str) -> Result<Account, AuthError> {
        match self.challenges.redeem(self.repository.as_ref(), token).await {
            Ok(account) => {
                info!(email = %account.email, "email verified");
                Ok(account)
            }
            Err(ChallengeError::NotFound | ChallengeError::Expired) => {
                Err(AuthError::InvalidVerificationToken)
            }
            Err(ChallengeError::Repository(err)) => Err(AuthError::Internal(err)),
        }
    }

    /// Resolve an access token into its account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] or [`AuthError::InvalidToken`]
    /// for an unusable token, [`AuthError::AccountNotFound`] when the
    /// subject no longer exists.
    pub async fn authenticate(&self, access_token: &str) -> Result<Account, AuthError> {
        let subject = self
            .tokens
            .validate(access_token, TokenKind::Access)
            .map_err(map_token_error)?;
        self.profile(subject).await
    }

    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountNotFound`] when no account matches.
    pub async fn profile(&self, id: Uuid) -> Result<Account, AuthError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Handle a federated-login intent.
    ///
    /// Without a code the caller gets the authorization redirect. With
    /// one, the bridge resolves an account which is then treated exactly
    /// like a direct login: tokens for a verified account, a fresh
    /// challenge for an unverified one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::FederationFailed`] when no bridge is
    /// configured or the provider exchange fails.
    pub async fn federated_login(
        &self,
        code: Option<&str>,
    ) -> Result<FederatedOutcome, AuthError> {
        let Some(bridge) = self.bridge.as_ref() else {
            return Err(AuthError::FederationFailed);
        };

        let Some(code) = code.filter(|code| !code.trim().is_empty()) else {
            return Ok(FederatedOutcome::AuthorizeRedirect(
                bridge.authorization_url(),
            ));
        };

        let account = bridge.authenticate(code).await?;
        if !account.is_email_verified {
            let issued = self.issue_challenge(&account).await?;
            return Ok(FederatedOutcome::VerificationRequired {
                delivered: issued.delivered,
            });
        }

        let tokens = self.issue_pair(account.id)?;
        Ok(FederatedOutcome::Authenticated { account, tokens })
    }

    /// Probe the underlying account store (health endpoint).
    ///
    /// # Errors
    ///
    /// Returns the repository's failure unchanged.
    pub async fn store_ping(&self) -> anyhow::Result<()> {
        self.repository.ping().await
    }

    fn issue_pair(&self, subject: Uuid) -> Result<TokenPair, AuthError> {
        let access_token = self
            .tokens
            .issue_access(subject)
            .map_err(|err| AuthError::Internal(err.into()))?;
        let refresh_token = self
            .tokens
            .issue_refresh(subject)
            .map_err(|err| AuthError::Internal(err.into()))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn issue_challenge(
        &self,
        account: &Account,
    ) -> Result<super::verification::ChallengeIssued, AuthError> {
        self.challenges
            .issue(self.repository.as_ref(), self.sender.as_ref(), account)
            .await
            .map_err(|err| match err {
                ChallengeError::Repository(err) => AuthError::Internal(err),
                // Issuance never reports NotFound/Expired.
                other => AuthError::Internal(anyhow::anyhow!(other)),
            })
    }
}

fn map_token_error(err: TokenError) -> AuthError {
    match err {
        TokenError::Expired => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    }
}
