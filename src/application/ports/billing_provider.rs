use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::plan::Plan};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer at the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a Direct Debit mandate at the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MandateId(pub String);

impl MandateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MandateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription at the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Redirect targets for the hosted authorization flow.
#[derive(Debug, Clone)]
pub struct FlowUrls {
    pub redirect_uri: String,
    pub exit_uri: String,
}

/// Result of starting an authorization flow: where to send the user.
#[derive(Debug, Clone, Serialize)]
pub struct StartedFlow {
    pub flow_id: String,
    pub authorisation_url: String,
}

/// The links a billing request carries once the user has authorized it.
/// Both must be present before a subscription can be registered.
#[derive(Debug, Clone)]
pub struct CompletedFlow {
    pub billing_request_id: String,
    pub customer_id: Option<CustomerId>,
    pub mandate_id: Option<MandateId>,
}

impl CompletedFlow {
    /// The flow is complete only when the processor has linked both a
    /// customer and a confirmed mandate.
    pub fn is_complete(&self) -> bool {
        self.customer_id.is_some() && self.mandate_id.is_some()
    }
}

/// A subscription as registered at the processor.
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub id: SubscriptionId,
    pub status: String,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub next_charge_date: Option<chrono::NaiveDateTime>,
}

// ============================================================================
// Billing Provider Port
// ============================================================================

/// Abstracts the payment processor behind domain-level actions.
///
/// The two-step flow creation (billing request, then billing request flow
/// referencing it) is sequential and non-cancellable: a failure of the second
/// call leaves an orphaned, harmless billing request at the processor.
#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    /// Create a billing request (mandate scheme + payment amount) and wrap it
    /// in a billing request flow carrying the redirect URIs. Returns the
    /// flow's hosted authorization URL. The user id is attached as metadata
    /// so webhook events can be attributed.
    async fn start_flow(
        &self,
        plan: &Plan,
        user_id: Uuid,
        customer_email: &str,
        urls: &FlowUrls,
    ) -> AppResult<StartedFlow>;

    /// Fetch a flow and its linked billing request after the user returns
    /// from the hosted page. The links may be absent when the user abandoned
    /// authorization; the caller decides whether that is an error.
    async fn fetch_flow(&self, flow_id: &str) -> AppResult<CompletedFlow>;

    /// Register an ongoing subscription against an authorized mandate.
    async fn create_subscription(
        &self,
        plan: &Plan,
        mandate: &MandateId,
        user_id: Uuid,
    ) -> AppResult<ProviderSubscription>;

    /// Cancel a subscription at the processor.
    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()>;
}
