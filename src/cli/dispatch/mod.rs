use crate::cli::actions::{Action, GoogleSettings, ServerSettings};
use anyhow::{Context, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let google = match (
        matches.get_one::<String>("google-client-id"),
        matches.get_one::<String>("google-client-secret"),
        matches.get_one::<String>("google-redirect-url"),
    ) {
        (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleSettings {
            client_id: client_id.to_string(),
            client_secret: SecretString::from(client_secret.to_string()),
            redirect_url: redirect_url.to_string(),
        }),
        (None, _, _) => None,
        _ => anyhow::bail!(
            "federated login needs --google-client-id, --google-client-secret and --google-redirect-url together"
        ),
    };

    let settings = ServerSettings {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches.get_one::<String>("dsn").map(String::to_string),
        client_url: matches
            .get_one::<String>("client-url")
            .map(String::to_string)
            .context("missing argument: --client-url")?,
        access_token_secret: matches
            .get_one::<String>("access-token-secret")
            .map(|secret| SecretString::from(secret.to_string()))
            .context("missing required argument: --access-token-secret")?,
        refresh_token_secret: matches
            .get_one::<String>("refresh-token-secret")
            .map(|secret| SecretString::from(secret.to_string()))
            .context("missing required argument: --refresh-token-secret")?,
        access_token_ttl_seconds: matches
            .get_one::<i64>("access-token-ttl")
            .copied()
            .unwrap_or(900),
        refresh_token_ttl_seconds: matches
            .get_one::<i64>("refresh-token-ttl")
            .copied()
            .unwrap_or(604_800),
        verification_ttl_seconds: matches
            .get_one::<i64>("verification-ttl")
            .copied()
            .unwrap_or(86_400),
        hash_cost: matches.get_one::<u32>("hash-cost").copied().unwrap_or(10),
        google,
    };

    Ok(Action::Server {
        settings: Box::new(settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        let mut full = vec![
            "atesto",
            "--access-token-secret",
            "access-secret",
            "--refresh-token-secret",
            "refresh-secret",
        ];
        full.extend_from_slice(args);
        commands::new().get_matches_from(full)
    }

    #[test]
    fn server_action_carries_settings() -> Result<()> {
        let action = handler(&matches(&["--port", "9999"]))?;
        let Action::Server { settings } = action;
        assert_eq!(settings.port, 9999);
        assert!(settings.dsn.is_none());
        assert_eq!(settings.access_token_secret.expose_secret(), "access-secret");
        assert_eq!(
            settings.refresh_token_secret.expose_secret(),
            "refresh-secret"
        );
        assert!(settings.google.is_none());
        Ok(())
    }

    #[test]
    fn google_settings_require_all_three() -> Result<()> {
        let action = handler(&matches(&[
            "--google-client-id",
            "client-id",
            "--google-client-secret",
            "client-secret",
            "--google-redirect-url",
            "https://app.example.com/auth/google/callback",
        ]))?;
        let Action::Server { settings } = action;
        let google = settings.google.expect("google settings present");
        assert_eq!(google.client_id, "client-id");
        assert_eq!(
            google.redirect_url,
            "https://app.example.com/auth/google/callback"
        );
        Ok(())
    }

    #[test]
    fn partial_google_settings_fail() {
        let result = handler(&matches(&["--google-client-id", "client-id"]));
        assert!(result.is_err());
    }
}
