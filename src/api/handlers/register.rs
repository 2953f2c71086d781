//! Registration endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{MessageResponse, RegisterRequest};
use crate::auth::{utils::valid_email, AuthService, RegisterOutcome};

fn verification_message(delivered: bool) -> String {
    if delivered {
        "Verification email sent successfully".to_string()
    } else {
        "Verification challenge issued; email delivery failed".to_string()
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification challenge issued", body = MessageResponse),
        (status = 200, description = "Email already registered but unverified; challenge re-issued", body = MessageResponse),
        (status = 400, description = "Missing or invalid payload", body = String),
        (status = 409, description = "Email already registered and verified", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.username.trim().is_empty() || request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing fields".to_string()).into_response();
    }
    if !valid_email(&request.email.trim().to_lowercase()) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match service
        .register(&request.username, &request.email, &request.password)
        .await
    {
        Ok(RegisterOutcome::Created { delivered }) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: verification_message(delivered),
            }),
        )
            .into_response(),
        Ok(RegisterOutcome::ChallengeResent { delivered }) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: verification_message(delivered),
            }),
        )
            .into_response(),
        Err(err) => super::error_response(&err).into_response(),
    }
}
