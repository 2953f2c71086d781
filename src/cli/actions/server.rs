use crate::account::{AccountRepository, MemoryRepository, PgRepository};
use crate::api;
use crate::auth::{AuthService, ChallengeIssuer, PasswordHasher, TokenIssuer};
use crate::cli::actions::Action;
use crate::email::LogSender;
use crate::federation::{GoogleBridge, GoogleProvider};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Handle the server action
///
/// # Errors
///
/// Returns an error when the database or provider client cannot be set
/// up, or the server fails to bind.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server { settings } = action;

    // Connect to database, or fall back to the in-process store
    let repository: Arc<dyn AccountRepository> = match &settings.dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;
            Arc::new(PgRepository::new(pool))
        }
        None => {
            info!("No DSN configured, using the in-memory account store");
            Arc::new(MemoryRepository::new())
        }
    };

    let tokens = TokenIssuer::new(
        settings.access_token_secret.clone(),
        settings.refresh_token_secret.clone(),
    )
    .with_access_ttl_seconds(settings.access_token_ttl_seconds)
    .with_refresh_ttl_seconds(settings.refresh_token_ttl_seconds);

    let mut service = AuthService::new(
        repository.clone(),
        Arc::new(LogSender),
        PasswordHasher::new().with_cost(settings.hash_cost),
        tokens,
        ChallengeIssuer::new().with_ttl_seconds(settings.verification_ttl_seconds),
    );

    if let Some(google) = &settings.google {
        let provider = GoogleProvider::new(
            google.client_id.clone(),
            google.client_secret.clone(),
            google.redirect_url.clone(),
        )?;
        service = service.with_bridge(GoogleBridge::new(provider, repository));
        info!("Federated login enabled");
    }

    api::new(settings.port, &settings.client_url, Arc::new(service)).await?;

    Ok(())
}
