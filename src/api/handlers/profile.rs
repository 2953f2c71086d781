//! Authenticated profile endpoint.

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::ProfileResponse;
use crate::auth::AuthService;

#[utoipa::path(
    get,
    path = "/auth/profile",
    params(
        ("Authorization" = String, Header, description = "Bearer access token")
    ),
    responses(
        (status = 200, description = "Profile for the token's subject", body = ProfileResponse),
        (status = 401, description = "Missing, invalid, or expired access token", body = String),
        (status = 404, description = "Subject account no longer exists", body = String)
    ),
    tag = "auth"
)]
pub async fn profile(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
) -> impl IntoResponse {
    let Some(token) = super::extract_bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing bearer token".to_string()).into_response();
    };

    match service.authenticate(&token).await {
        Ok(account) => (
            StatusCode::OK,
            Json(ProfileResponse {
                id: account.id.to_string(),
                email: account.email,
                username: account.username,
                is_email_verified: account.is_email_verified,
            }),
        )
            .into_response(),
        Err(err) => super::error_response(&err).into_response(),
    }
}
