//! Federated (Google) login endpoints.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::types::{AuthUrlResponse, CallbackParams, MessageResponse, TokenPairResponse};
use crate::auth::{AuthService, FederatedOutcome};

fn outcome_response(outcome: FederatedOutcome) -> axum::response::Response {
    match outcome {
        FederatedOutcome::AuthorizeRedirect(url) => (
            StatusCode::OK,
            Json(AuthUrlResponse {
                auth_url: url.to_string(),
            }),
        )
            .into_response(),
        FederatedOutcome::Authenticated { tokens, .. } => (
            StatusCode::OK,
            Json(TokenPairResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            }),
        )
            .into_response(),
        FederatedOutcome::VerificationRequired { .. } => (
            StatusCode::ACCEPTED,
            Json(MessageResponse {
                message: "Verification email sent successfully".to_string(),
            }),
        )
            .into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/auth/google",
    params(CallbackParams),
    responses(
        (status = 200, description = "Authenticated; token pair returned", body = TokenPairResponse),
        (status = 400, description = "Missing authorization code", body = String),
        (status = 401, description = "Federated authentication failed", body = String)
    ),
    tag = "auth"
)]
pub async fn google_auth(
    service: Extension<Arc<AuthService>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let Some(code) = params.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string()).into_response();
    };

    match service.federated_login(Some(code)).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => super::error_response(&err).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackParams),
    responses(
        (status = 200, description = "Token pair, or the authorization URL when no code was supplied", body = TokenPairResponse),
        (status = 401, description = "Federated authentication failed", body = String)
    ),
    tag = "auth"
)]
pub async fn google_callback(
    service: Extension<Arc<AuthService>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    // A bare callback probe gets the authorization URL, which is a
    // distinct outcome from authentication success.
    match service.federated_login(params.code.as_deref()).await {
        Ok(outcome) => outcome_response(outcome),
        Err(err) => super::error_response(&err).into_response(),
    }
}
