//! Email verification endpoint.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::types::MessageResponse;
use crate::auth::AuthService;

#[utoipa::path(
    get,
    path = "/auth/verify-email/{token}",
    params(
        ("token" = String, Path, description = "Verification challenge token from the email link")
    ),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired verification token", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    service: Extension<Arc<AuthService>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let token = token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }

    match service.verify_email(token).await {
        Ok(_account) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Email verified successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => super::error_response(&err).into_response(),
    }
}
