use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Pending,
    Active,
    PastDue,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Convert from a GoCardless subscription status string.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "cancelled" => SubscriptionStatus::Cancelled,
            "finished" => SubscriptionStatus::Expired,
            // pending_customer_approval, paused and anything new stay pending:
            // never grant access on an unrecognised status
            _ => SubscriptionStatus::Pending,
        }
    }

    /// Returns true if the user should have access to gated features.
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Cancelled and expired are terminal: a late-arriving activation
    /// duplicate must never resurrect such a record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired
        )
    }
}

/// Where the recorded plan came from. The flow completion path is
/// authoritative; amount inference from a webhook is a best-effort fallback
/// and must not overwrite a flow-sourced plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Flow,
    AmountInference,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Flow => "flow",
            PlanSource::AmountInference => "amount_inference",
        }
    }
}

/// One row per end user. Never hard-deleted; cancellation is a status value.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gocardless_customer_id: Option<String>,
    pub gocardless_mandate_id: Option<String>,
    pub gocardless_subscription_id: Option<String>,
    pub plan_id: Option<String>,
    pub plan_source: Option<PlanSource>,
    pub status: SubscriptionStatus,
    pub amount_pence: Option<i32>,
    pub currency: Option<String>,
    pub started_at: Option<chrono::NaiveDateTime>,
    pub cancelled_at: Option<chrono::NaiveDateTime>,
    pub next_payment_date: Option<chrono::NaiveDateTime>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
