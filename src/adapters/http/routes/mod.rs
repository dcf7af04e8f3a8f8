pub mod billing;
pub mod webhooks;

use axum::{Router, http::HeaderMap};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router())
        .nest("/webhooks", webhooks::router())
}

/// Resolve the caller from the `Authorization: Bearer` header. Tokens are
/// issued by the authentication collaborator and share the JWT secret.
pub fn current_user(headers: &HeaderMap, app_state: &AppState) -> AppResult<Uuid> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;

    let claims = jwt::verify(token, &app_state.config.jwt_secret)?;
    claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthenticated)
}
