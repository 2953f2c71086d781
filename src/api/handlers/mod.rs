//! HTTP handlers: thin adapters from requests to auth operations.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use tracing::error;

use crate::auth::AuthError;

pub(crate) mod google;
pub(crate) mod health;
pub(crate) mod login;
pub(crate) mod profile;
pub(crate) mod register;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod verify;

/// Map a typed auth failure onto a stable status code and message.
///
/// Internal faults are logged here and never echoed to the caller.
pub(crate) fn error_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::AccountAlreadyExists => {
            (StatusCode::CONFLICT, "Account already exists".to_string())
        }
        AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "Account not found".to_string()),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
        AuthError::InvalidVerificationToken => (
            StatusCode::BAD_REQUEST,
            "Invalid or expired verification token".to_string(),
        ),
        AuthError::FederationFailed => (
            StatusCode::UNAUTHORIZED,
            "Federated authentication failed".to_string(),
        ),
        AuthError::CorruptCredential => {
            error!("Stored credential is corrupt");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        AuthError::Internal(err) => {
            error!("Internal auth failure: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Pull a bearer token out of the Authorization header.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn error_response_statuses_are_stable() {
        let (status, _) = error_response(&AuthError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = error_response(&AuthError::AccountAlreadyExists);
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = error_response(&AuthError::AccountNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = error_response(&AuthError::InvalidVerificationToken);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, message) = error_response(&AuthError::Internal(anyhow::anyhow!("boom")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // Internal detail never reaches the caller.
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_token_missing_or_empty_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
