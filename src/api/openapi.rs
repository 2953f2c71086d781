//! OpenAPI document assembly.

use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::login::login,
        handlers::token::refresh,
        handlers::verify::verify_email,
        handlers::profile::profile,
        handlers::google::google_auth,
        handlers::google::google_callback,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::types::RegisterRequest,
        handlers::types::LoginRequest,
        handlers::types::RefreshRequest,
        handlers::types::TokenPairResponse,
        handlers::types::AccessTokenResponse,
        handlers::types::MessageResponse,
        handlers::types::ProfileResponse,
        handlers::types::AuthUrlResponse,
    )),
    tags(
        (name = "auth", description = "Registration, login, verification, and federation"),
        (name = "health", description = "Service liveness")
    )
)]
pub struct ApiDoc;

/// The assembled OpenAPI document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
