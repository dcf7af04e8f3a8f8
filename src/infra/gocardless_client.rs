use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::app_error::{AppError, AppResult};

const API_VERSION: &str = "2015-07-06";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoCardlessEnvironment {
    Sandbox,
    Live,
}

impl GoCardlessEnvironment {
    pub fn api_base(&self) -> &'static str {
        match self {
            GoCardlessEnvironment::Sandbox => "https://api-sandbox.gocardless.com",
            GoCardlessEnvironment::Live => "https://api.gocardless.com",
        }
    }
}

/// Thin HTTP client for the GoCardless REST API. Every resource is wrapped in
/// a singular envelope key on the wire ("billing_requests", "subscriptions").
#[derive(Clone)]
pub struct GoCardlessClient {
    client: Client,
    access_token: SecretString,
    base_url: String,
}

impl GoCardlessClient {
    pub fn new(access_token: SecretString, environment: GoCardlessEnvironment) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url: environment.api_base().to_string(),
        }
    }

    // ========================================================================
    // Billing requests and flows
    // ========================================================================

    /// Create a billing request asking for a bacs mandate plus the plan's
    /// initial payment. First half of the two-step flow creation; a failure
    /// afterwards leaves this request orphaned at the processor, which is
    /// harmless.
    pub async fn create_billing_request(
        &self,
        amount_pence: i32,
        currency: &str,
        description: &str,
        user_id: &str,
        plan_id: &str,
    ) -> AppResult<BillingRequest> {
        let body = billing_request_body(amount_pence, currency, description, user_id, plan_id);

        let response: Envelope<BillingRequest> =
            self.post("/billing_requests", &body, "billing_requests").await?;
        Ok(response.resource)
    }

    /// Wrap a billing request in a hosted flow carrying the redirect targets.
    pub async fn create_billing_request_flow(
        &self,
        billing_request_id: &str,
        redirect_uri: &str,
        exit_uri: &str,
        customer_email: &str,
    ) -> AppResult<BillingRequestFlow> {
        let body = json!({
            "billing_request_flows": {
                "redirect_uri": redirect_uri,
                "exit_uri": exit_uri,
                "prefilled_customer": {
                    "email": customer_email,
                },
                "links": {
                    "billing_request": billing_request_id,
                },
            }
        });

        let response: Envelope<BillingRequestFlow> = self
            .post("/billing_request_flows", &body, "billing_request_flows")
            .await?;
        Ok(response.resource)
    }

    pub async fn get_billing_request_flow(&self, flow_id: &str) -> AppResult<BillingRequestFlow> {
        let response: Envelope<BillingRequestFlow> = self
            .get(
                &format!("/billing_request_flows/{flow_id}"),
                "billing_request_flows",
            )
            .await?;
        Ok(response.resource)
    }

    pub async fn get_billing_request(&self, billing_request_id: &str) -> AppResult<BillingRequest> {
        let response: Envelope<BillingRequest> = self
            .get(
                &format!("/billing_requests/{billing_request_id}"),
                "billing_requests",
            )
            .await?;
        Ok(response.resource)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn create_subscription(
        &self,
        amount_pence: i32,
        currency: &str,
        interval_unit: &str,
        mandate_id: &str,
        user_id: &str,
        plan_id: &str,
    ) -> AppResult<GcSubscription> {
        let body = json!({
            "subscriptions": {
                "amount": amount_pence,
                "currency": currency,
                "interval_unit": interval_unit,
                "links": {
                    "mandate": mandate_id,
                },
                "metadata": {
                    "user_id": user_id,
                    "plan_id": plan_id,
                },
            }
        });

        let response: Envelope<GcSubscription> =
            self.post("/subscriptions", &body, "subscriptions").await?;
        Ok(response.resource)
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<GcSubscription> {
        let body = json!({ "data": {} });
        let response: Envelope<GcSubscription> = self
            .post(
                &format!("/subscriptions/{subscription_id}/actions/cancel"),
                &body,
                "subscriptions",
            )
            .await?;
        Ok(response.resource)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
        envelope_key: &'static str,
    ) -> AppResult<Envelope<T>> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.access_token.expose_secret())
            .header("GoCardless-Version", API_VERSION)
            .header("Idempotency-Key", random_idempotency_key())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("GoCardless request failed: {}", e)))?;

        handle_response(response, envelope_key).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        envelope_key: &'static str,
    ) -> AppResult<Envelope<T>> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.access_token.expose_secret())
            .header("GoCardless-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("GoCardless request failed: {}", e)))?;

        handle_response(response, envelope_key).await
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    envelope_key: &'static str,
) -> AppResult<Envelope<T>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Provider(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        tracing::error!(status = %status, body = %body, "GoCardless API error");
        return Err(AppError::Provider(format!(
            "GoCardless returned {}",
            status
        )));
    }

    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| AppError::Provider(format!("Invalid GoCardless response: {}", e)))?;
    let resource = value
        .get(envelope_key)
        .cloned()
        .ok_or_else(|| AppError::Provider(format!("Missing '{}' in response", envelope_key)))?;
    let resource: T = serde_json::from_value(resource)
        .map_err(|e| AppError::Provider(format!("Invalid GoCardless response: {}", e)))?;

    Ok(Envelope { resource })
}

fn billing_request_body(
    amount_pence: i32,
    currency: &str,
    description: &str,
    user_id: &str,
    plan_id: &str,
) -> serde_json::Value {
    json!({
        "billing_requests": {
            "mandate_request": {
                "scheme": "bacs",
                "currency": currency,
            },
            "payment_request": {
                "amount": amount_pence,
                "currency": currency,
                "description": description,
            },
            "metadata": {
                "user_id": user_id,
                "plan_id": plan_id,
            },
        }
    })
}

fn random_idempotency_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct Envelope<T> {
    pub resource: T,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BillingRequest {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub links: BillingRequestLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingRequestLinks {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub mandate_request_mandate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingRequestFlow {
    pub id: String,
    pub authorisation_url: String,
    #[serde(default)]
    pub links: BillingRequestFlowLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingRequestFlowLinks {
    #[serde(default)]
    pub billing_request: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub upcoming_payments: Vec<UpcomingPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingPayment {
    pub charge_date: chrono::NaiveDate,
    pub amount: i32,
}

// ============================================================================
// Webhook signature verification
// ============================================================================

/// Verify a webhook delivery: the `Webhook-Signature` header carries the
/// lowercase hex HMAC-SHA256 of the raw request body under the endpoint
/// secret. Verification runs against the exact bytes received, before any
/// JSON parsing, and fails closed when the secret or header is missing.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &SecretString,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let secret = webhook_secret.expose_secret();
    if secret.is_empty() || signature_header.is_empty() {
        return Err(AppError::InvalidSignature);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_compare(signature_header, &expected) {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
