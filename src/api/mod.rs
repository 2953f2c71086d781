//! HTTP boundary: routes, middleware stack, and server lifecycle.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

use crate::auth::AuthService;

pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Build the router with every documented route registered.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(handlers::register::register))
        .route("/auth/login", post(handlers::login::login))
        .route("/auth/refresh-token", post(handlers::token::refresh))
        .route(
            "/auth/verify-email/:token",
            get(handlers::verify::verify_email),
        )
        .route("/auth/profile", get(handlers::profile::profile))
        .route("/auth/google", get(handlers::google::google_auth))
        .route(
            "/auth/google/callback",
            get(handlers::google::google_callback),
        )
        .route("/openapi.json", get(|| async { Json(openapi()) }))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, client_url: &str, service: Arc<AuthService>) -> Result<()> {
    let client_origin = client_origin(client_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(client_origin))
        .allow_credentials(true);

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(service)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn client_origin(client_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(client_url).with_context(|| format!("Invalid client URL: {client_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Client URL must include a valid host: {client_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build client origin header")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::account::MemoryRepository;
    use crate::auth::{ChallengeIssuer, PasswordHasher, TokenIssuer};
    use crate::email::LogSender;
    use crate::federation::{GoogleBridge, GoogleProvider};
    use secrecy::SecretString;

    pub(crate) fn memory_service() -> Arc<AuthService> {
        let repository = Arc::new(MemoryRepository::new());
        Arc::new(AuthService::new(
            repository,
            Arc::new(LogSender),
            PasswordHasher::new().with_cost(4),
            TokenIssuer::new(
                SecretString::from("access-secret".to_string()),
                SecretString::from("refresh-secret".to_string()),
            ),
            ChallengeIssuer::new(),
        ))
    }

    pub(crate) fn memory_service_with_bridge() -> Arc<AuthService> {
        let repository = Arc::new(MemoryRepository::new());
        let provider = GoogleProvider::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            "https://app.example.com/auth/google/callback".to_string(),
        )
        .expect("provider builds");
        let service = AuthService::new(
            repository.clone(),
            Arc::new(LogSender),
            PasswordHasher::new().with_cost(4),
            TokenIssuer::new(
                SecretString::from("access-secret".to_string()),
                SecretString::from("refresh-secret".to_string()),
            ),
            ChallengeIssuer::new(),
        )
        .with_bridge(GoogleBridge::new(provider, repository));
        Arc::new(service)
    }

    pub(crate) async fn register_account(
        service: &AuthService,
        email: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        service.register("alice", email, password).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::client_origin;

    #[test]
    fn client_origin_strips_path() -> anyhow::Result<()> {
        let origin = client_origin("https://app.example.com/some/path")?;
        assert_eq!(origin.to_str()?, "https://app.example.com");
        Ok(())
    }

    #[test]
    fn client_origin_keeps_explicit_port() -> anyhow::Result<()> {
        let origin = client_origin("http://localhost:3000")?;
        assert_eq!(origin.to_str()?, "http://localhost:3000");
        Ok(())
    }

    #[test]
    fn client_origin_rejects_garbage() {
        assert!(client_origin("not a url").is_err());
    }
}
