//! Authenticated billing endpoints: starting and completing the subscription
//! flow, reading entitlement, cancelling.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, routes::current_user},
    app_error::AppResult,
    domain::entities::subscription::Subscription,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/callback", get(callback))
        .route("/status", get(get_status))
        .route("/cancel", post(cancel))
        .route("/plans", get(list_plans))
}

#[derive(Deserialize)]
struct SubscribeRequest {
    plan_id: String,
}

#[derive(Serialize)]
struct SubscribeResponse {
    flow_id: String,
    redirect_url: String,
}

async fn subscribe(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubscribeRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state)?;

    let flow = app_state
        .flow_use_cases
        .start_flow(user_id, &body.plan_id)
        .await?;

    Ok(Json(SubscribeResponse {
        flow_id: flow.flow_id,
        redirect_url: flow.authorisation_url,
    }))
}

#[derive(Deserialize)]
struct CallbackQuery {
    redirect_flow_id: String,
    plan: String,
}

/// The user lands here coming back from the hosted authorization page, so
/// the response is a redirect into the dashboard rather than JSON. Flow
/// errors surface as a query parameter; the processor never retries this
/// path.
async fn callback(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Redirect> {
    let user_id = current_user(&headers, &app_state)?;

    let dashboard = format!("{}dashboard", app_state.config.app_origin);
    match app_state
        .flow_use_cases
        .complete_flow(&query.redirect_flow_id, user_id, &query.plan)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("{}?subscription=success", dashboard))),
        Err(e) => {
            tracing::error!(error = %e, flow_id = %query.redirect_flow_id, "Flow completion failed");
            Ok(Redirect::to(&format!(
                "{}?error={}",
                dashboard,
                e.code().as_str()
            )))
        }
    }
}

#[derive(Serialize)]
struct SubscriptionResponse {
    status: &'static str,
    plan_id: Option<String>,
    amount_pence: Option<i32>,
    currency: Option<String>,
    started_at: Option<chrono::NaiveDateTime>,
    cancelled_at: Option<chrono::NaiveDateTime>,
    next_payment_date: Option<chrono::NaiveDateTime>,
}

impl SubscriptionResponse {
    fn from_record(record: &Subscription) -> Self {
        Self {
            status: record.status.as_str(),
            plan_id: record.plan_id.clone(),
            amount_pence: record.amount_pence,
            currency: record.currency.clone(),
            started_at: record.started_at,
            cancelled_at: record.cancelled_at,
            next_payment_date: record.next_payment_date,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    has_active_subscription: bool,
    subscription: Option<SubscriptionResponse>,
}

async fn get_status(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&headers, &app_state)?;

    let record = app_state.status_use_cases.get(user_id).await?;
    let has_active_subscription = record.as_ref().is_some_and(|s| s.status.is_active());

    Ok(Json(StatusResponse {
        has_active_subscription,
        subscription: record.as_ref().map(SubscriptionResponse::from_record),
    }))
}

async fn cancel(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let user_id = current_user(&headers, &app_state)?;

    app_state.flow_use_cases.cancel(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(app_state.catalog.all().to_vec()))
}
