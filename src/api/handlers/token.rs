//! Token refresh endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{AccessTokenResponse, RefreshRequest};
use crate::auth::AuthService;

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = AccessTokenResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid or expired refresh token", body = String),
        (status = 404, description = "Subject account no longer exists", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }

    match service.refresh(token).await {
        Ok(access_token) => {
            (StatusCode::OK, Json(AccessTokenResponse { access_token })).into_response()
        }
        Err(err) => super::error_response(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::memory_service;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn missing_payload_is_rejected() {
        let service = memory_service();
        let response = refresh(Extension(service), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let service = memory_service();
        let response = refresh(
            Extension(service),
            Some(Json(RefreshRequest {
                token: "  ".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let service = memory_service();
        let response = refresh(
            Extension(service),
            Some(Json(RefreshRequest {
                token: "garbage".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
