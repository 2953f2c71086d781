//! Google OAuth2 client: authorization URL and code exchange.

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{FederationError, IdentityAssertion};

const DEFAULT_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Bounded timeout for every provider round-trip: a slow provider must
/// fail the login, not hang the request.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// OAuth2 authorization-code client for Google.
pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    auth_endpoint: Url,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleProvider {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_url: String,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .user_agent(crate::api::APP_USER_AGENT)
            .build()
            .context("failed to build identity provider http client")?;
        let auth_endpoint =
            Url::parse(DEFAULT_AUTH_ENDPOINT).context("failed to parse authorization endpoint")?;
        Ok(Self {
            http,
            client_id,
            client_secret,
            redirect_url,
            auth_endpoint,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.to_string(),
        })
    }

    /// Point the provider at alternate endpoints (local stubs in tests).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        auth_endpoint: Url,
        token_endpoint: String,
        userinfo_endpoint: String,
    ) -> Self {
        self.auth_endpoint = auth_endpoint;
        self.token_endpoint = token_endpoint;
        self.userinfo_endpoint = userinfo_endpoint;
        self
    }

    /// Build the authorization redirect for the requested scopes.
    #[must_use]
    pub fn authorization_url(&self, scopes: &[&str]) -> Url {
        let mut url = self.auth_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline");
        url
    }

    /// Exchange an authorization code for an identity assertion.
    ///
    /// Two provider round-trips: the token endpoint for an access token,
    /// then the userinfo endpoint for the asserted identity. Both are
    /// bounded by [`EXCHANGE_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns a [`FederationError`] when either round-trip fails, the
    /// provider responds with a non-success status, or the assertion is
    /// missing its email.
    pub async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, FederationError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", &self.redirect_url),
        ];
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FederationError::ProviderStatus(response.status().as_u16()));
        }
        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|_| FederationError::Assertion)?;

        let response = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FederationError::ProviderStatus(response.status().as_u16()));
        }
        let info: UserInfo = response
            .json()
            .await
            .map_err(|_| FederationError::Assertion)?;

        if info.email.trim().is_empty() {
            return Err(FederationError::Assertion);
        }

        Ok(IdentityAssertion {
            subject: info.sub,
            email: info.email,
            name: info.name,
            email_verified: info.email_verified,
        })
    }
}
