//! Login endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{LoginRequest, MessageResponse, TokenPairResponse};
use crate::auth::{AuthService, LoginOutcome};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; token pair returned", body = TokenPairResponse),
        (status = 202, description = "Email unverified; verification challenge re-issued", body = MessageResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match service.login(&request.email, &request.password).await {
        Ok(LoginOutcome::Authenticated(pair)) => (
            StatusCode::OK,
            Json(TokenPairResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        // No credentials for unverified accounts; the challenge went
        // back out instead.
        Ok(LoginOutcome::VerificationRequired { .. }) => (
            StatusCode::ACCEPTED,
            Json(MessageResponse {
                message: "Verification email sent successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => super::error_response(&err).into_response(),
    }
}
