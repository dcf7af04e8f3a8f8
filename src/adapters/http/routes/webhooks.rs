//! GoCardless webhook endpoint.
//!
//! The signature is verified against the raw body bytes before any parsing.
//! Events in a batch fail independently; when any of them fails the response
//! is a 500 so the processor redelivers the whole batch, which is safe
//! because every transition is idempotent.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::reconcile::normalize,
    domain::entities::webhook_event::WebhookPayload,
    infra::gocardless_client::verify_webhook_signature,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/gocardless", post(handle_webhook))
}

async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("webhook-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    verify_webhook_signature(
        &body,
        signature,
        &app_state.config.gocardless_webhook_secret,
    )?;

    let payload: WebhookPayload = serde_json::from_str(&body)
        .map_err(|e| crate::app_error::AppError::InvalidInput(format!("Bad payload: {}", e)))?;

    let events = normalize(payload);
    let outcome = app_state.reconcile_use_cases.apply_batch(&events).await;

    if !outcome.all_succeeded() {
        tracing::error!(
            failed = outcome.failed,
            applied = outcome.applied,
            "Webhook batch had failures, returning 500 for redelivery"
        );
        return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    tracing::info!(
        applied = outcome.applied,
        informational = outcome.informational,
        skipped = outcome.skipped,
        "Webhook batch processed"
    );
    Ok(Json(serde_json::json!({ "received": true })).into_response())
}
