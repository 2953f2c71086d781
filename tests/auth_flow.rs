//! End-to-end credential lifecycle against the in-memory store.

use anyhow::{bail, Context, Result};
use atesto::account::MemoryRepository;
use atesto::auth::{
    AuthError, AuthService, ChallengeIssuer, LoginOutcome, PasswordHasher, RegisterOutcome,
    TokenIssuer,
};
use atesto::email::{DeliveryError, VerificationSender};
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

/// Captures every outbound verification message so the test can follow
/// the email link the way a user would.
struct Mailbox {
    messages: Mutex<Vec<(String, String)>>,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    fn last_token_for(&self, address: &str) -> Option<String> {
        self.messages
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|(to, _)| to == address)
            .map(|(_, token)| token.clone())
    }
}

impl VerificationSender for Mailbox {
    fn send_verification(&self, address: &str, token: &str) -> Result<(), DeliveryError> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((address.to_string(), token.to_string()));
        }
        Ok(())
    }
}

fn service() -> (AuthService, Arc<Mailbox>) {
    let repository = Arc::new(MemoryRepository::new());
    let mailbox = Arc::new(Mailbox::new());
    let service = AuthService::new(
        repository,
        mailbox.clone(),
        PasswordHasher::new().with_cost(4),
        TokenIssuer::new(
            SecretString::from("integration-access-secret".to_string()),
            SecretString::from("integration-refresh-secret".to_string()),
        ),
        ChallengeIssuer::new(),
    );
    (service, mailbox)
}

#[tokio::test]
async fn register_verify_login_refresh_round_trip() -> Result<()> {
    let (service, mailbox) = service();

    // Register issues a challenge, not credentials.
    let outcome = service.register("alice", "a@x.com", "pw").await?;
    assert!(matches!(
        outcome,
        RegisterOutcome::Created { delivered: true }
    ));

    // Login before verification pivots to a resend.
    let outcome = service.login("a@x.com", "pw").await?;
    assert!(matches!(outcome, LoginOutcome::VerificationRequired { .. }));

    // Follow the email link.
    let token = mailbox
        .last_token_for("a@x.com")
        .context("no verification email recorded")?;
    let account = service.verify_email(&token).await?;
    assert!(account.is_email_verified);

    // Now login yields a pair.
    let LoginOutcome::Authenticated(pair) = service.login("a@x.com", "pw").await? else {
        bail!("expected tokens after verification");
    };

    // Refresh mints a new, distinct access token that authenticates.
    let access = service.refresh(&pair.refresh_token).await?;
    assert_ne!(access, pair.access_token);
    let account = service.authenticate(&access).await?;
    assert_eq!(account.email, "a@x.com");
    assert_eq!(account.username, "alice");
    Ok(())
}

#[tokio::test]
async fn verification_token_single_use_across_flows() -> Result<()> {
    let (service, mailbox) = service();

    service.register("alice", "a@x.com", "pw").await?;
    let first = mailbox
        .last_token_for("a@x.com")
        .context("no verification email recorded")?;

    // A repeated registration re-issues and invalidates the old token.
    let outcome = service.register("alice", "a@x.com", "pw").await?;
    assert!(matches!(outcome, RegisterOutcome::ChallengeResent { .. }));
    let result = service.verify_email(&first).await;
    assert!(matches!(result, Err(AuthError::InvalidVerificationToken)));

    // The fresh token verifies exactly once.
    let second = mailbox
        .last_token_for("a@x.com")
        .context("no verification email recorded")?;
    service.verify_email(&second).await?;
    let result = service.verify_email(&second).await;
    assert!(matches!(result, Err(AuthError::InvalidVerificationToken)));

    // Verified email cannot be registered again.
    let result = service.register("alice", "a@x.com", "pw").await;
    assert!(matches!(result, Err(AuthError::AccountAlreadyExists)));
    Ok(())
}

#[tokio::test]
async fn access_token_cannot_refresh() -> Result<()> {
    let (service, mailbox) = service();

    service.register("alice", "a@x.com", "pw").await?;
    let token = mailbox
        .last_token_for("a@x.com")
        .context("no verification email recorded")?;
    service.verify_email(&token).await?;

    let LoginOutcome::Authenticated(pair) = service.login("a@x.com", "pw").await? else {
        bail!("expected tokens after verification");
    };

    let result = service.refresh(&pair.access_token).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
    Ok(())
}
