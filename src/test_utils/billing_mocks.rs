//! In-memory mock implementations for the billing ports.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            billing_provider::{
                BillingProviderPort, CompletedFlow, CustomerId, FlowUrls, MandateId,
                ProviderSubscription, StartedFlow, SubscriptionId,
            },
            user_directory::{UserContact, UserDirectoryPort},
        },
        use_cases::reconcile::{FlowSubscriptionInput, PlanAssignment, SubscriptionRepo},
    },
    domain::entities::{
        plan::Plan,
        subscription::{PlanSource, Subscription, SubscriptionStatus},
    },
    test_utils::test_datetime,
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// In-memory stand-in for the Postgres store. Mirrors the conditional-write
/// semantics of the SQL statements: terminal statuses guard activation,
/// cancellation always wins, and timestamps are set once.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<Vec<Subscription>>,
    /// Lookups for these provider subscription ids fail with a database
    /// error, for exercising per-event failure isolation.
    pub failing_subscription_ids: Mutex<Vec<String>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        }
    }

    pub fn fail_on_subscription_id(&self, subscription_id: &str) {
        self.failing_subscription_ids
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
    }

    /// The single stored record, for assertions. `None` when the store holds
    /// zero or several records.
    pub fn sole_record(&self) -> Option<Subscription> {
        let records = self.subscriptions.lock().unwrap();
        if records.len() == 1 {
            Some(records[0].clone())
        } else {
            None
        }
    }

    pub fn all_records(&self) -> Vec<Subscription> {
        self.subscriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn get_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        if self
            .failing_subscription_ids
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == subscription_id)
        {
            return Err(AppError::Database("injected failure".to_string()));
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.gocardless_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn upsert_from_flow(&self, input: &FlowSubscriptionInput) -> AppResult<Subscription> {
        let mut records = self.subscriptions.lock().unwrap();
        let now = test_datetime();

        let record = Subscription {
            id: records
                .iter()
                .find(|s| s.user_id == input.user_id)
                .map(|s| s.id)
                .unwrap_or_else(Uuid::new_v4),
            user_id: input.user_id,
            gocardless_customer_id: Some(input.gocardless_customer_id.clone()),
            gocardless_mandate_id: Some(input.gocardless_mandate_id.clone()),
            gocardless_subscription_id: Some(input.gocardless_subscription_id.clone()),
            plan_id: Some(input.plan_id.clone()),
            plan_source: Some(PlanSource::Flow),
            status: input.status,
            amount_pence: Some(input.amount_pence),
            currency: Some(input.currency.clone()),
            started_at: input.started_at,
            cancelled_at: None,
            next_payment_date: input.next_payment_date,
            created_at: Some(now),
            updated_at: Some(now),
        };

        records.retain(|s| s.user_id != input.user_id);
        records.push(record.clone());
        Ok(record)
    }

    async fn mark_active_by_subscription_id(
        &self,
        subscription_id: &str,
        plan: Option<&PlanAssignment>,
    ) -> AppResult<u64> {
        let mut records = self.subscriptions.lock().unwrap();
        let mut touched = 0;
        for record in records
            .iter_mut()
            .filter(|s| s.gocardless_subscription_id.as_deref() == Some(subscription_id))
        {
            if record.status.is_terminal() {
                continue;
            }
            record.status = SubscriptionStatus::Active;
            record.started_at = record.started_at.or_else(|| Some(test_datetime()));
            if let Some(plan) = plan {
                if record.plan_id.is_none() {
                    record.plan_id = Some(plan.plan_id.clone());
                    record.plan_source = Some(plan.source);
                    record.amount_pence = Some(plan.amount_pence);
                    record.currency = Some(plan.currency.clone());
                }
            }
            record.updated_at = Some(test_datetime());
            touched += 1;
        }
        Ok(touched)
    }

    async fn set_status_by_subscription_id(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        let mut records = self.subscriptions.lock().unwrap();
        let mut touched = 0;
        for record in records
            .iter_mut()
            .filter(|s| s.gocardless_subscription_id.as_deref() == Some(subscription_id))
        {
            let allowed = match status {
                SubscriptionStatus::Cancelled => true,
                SubscriptionStatus::Expired => record.status != SubscriptionStatus::Cancelled,
                _ => !record.status.is_terminal(),
            };
            if !allowed {
                continue;
            }
            record.status = status;
            if status == SubscriptionStatus::Cancelled {
                record.cancelled_at = record.cancelled_at.or_else(|| Some(test_datetime()));
            }
            record.updated_at = Some(test_datetime());
            touched += 1;
        }
        Ok(touched)
    }

    async fn cancel_by_mandate_id(&self, mandate_id: &str) -> AppResult<u64> {
        let mut records = self.subscriptions.lock().unwrap();
        let mut touched = 0;
        for record in records
            .iter_mut()
            .filter(|s| s.gocardless_mandate_id.as_deref() == Some(mandate_id))
        {
            record.status = SubscriptionStatus::Cancelled;
            record.cancelled_at = record.cancelled_at.or_else(|| Some(test_datetime()));
            record.updated_at = Some(test_datetime());
            touched += 1;
        }
        Ok(touched)
    }

    async fn cancel_by_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut records = self.subscriptions.lock().unwrap();
        let mut touched = 0;
        for record in records.iter_mut().filter(|s| s.user_id == user_id) {
            record.status = SubscriptionStatus::Cancelled;
            record.cancelled_at = record.cancelled_at.or_else(|| Some(test_datetime()));
            record.updated_at = Some(test_datetime());
            touched += 1;
        }
        Ok(touched)
    }
}

// ============================================================================
// StubBillingProvider
// ============================================================================

/// Configurable payment processor stub. Defaults to a happily completed flow
/// ("BRF123" -> customer "CU123", mandate "MD123") and an active subscription
/// "SB123".
pub struct StubBillingProvider {
    pub flow: CompletedFlow,
    pub subscription_status: String,
    pub cancelled: Mutex<Vec<SubscriptionId>>,
}

impl Default for StubBillingProvider {
    fn default() -> Self {
        Self {
            flow: CompletedFlow {
                billing_request_id: "BR123".to_string(),
                customer_id: Some(CustomerId::new("CU123")),
                mandate_id: Some(MandateId::new("MD123")),
            },
            subscription_status: "active".to_string(),
            cancelled: Mutex::new(vec![]),
        }
    }
}

impl StubBillingProvider {
    pub fn with_flow(mut self, flow: CompletedFlow) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_subscription_status(mut self, status: &str) -> Self {
        self.subscription_status = status.to_string();
        self
    }

    pub fn cancelled_subscriptions(&self) -> Vec<SubscriptionId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingProviderPort for StubBillingProvider {
    async fn start_flow(
        &self,
        _plan: &Plan,
        _user_id: Uuid,
        _customer_email: &str,
        _urls: &FlowUrls,
    ) -> AppResult<StartedFlow> {
        Ok(StartedFlow {
            flow_id: "BRF123".to_string(),
            authorisation_url: "https://pay.example.com/flows/BRF123".to_string(),
        })
    }

    async fn fetch_flow(&self, _flow_id: &str) -> AppResult<CompletedFlow> {
        Ok(self.flow.clone())
    }

    async fn create_subscription(
        &self,
        _plan: &Plan,
        _mandate: &MandateId,
        _user_id: Uuid,
    ) -> AppResult<ProviderSubscription> {
        Ok(ProviderSubscription {
            id: SubscriptionId::new("SB123"),
            status: self.subscription_status.clone(),
            created_at: Some(test_datetime()),
            next_charge_date: None,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        self.cancelled.lock().unwrap().push(subscription_id.clone());
        Ok(())
    }
}

// ============================================================================
// InMemoryUserDirectory
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserDirectory {
    pub users: Mutex<HashMap<Uuid, String>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: Uuid, email: &str) -> Self {
        let directory = Self::default();
        directory
            .users
            .lock()
            .unwrap()
            .insert(user_id, email.to_string());
        directory
    }
}

#[async_trait]
impl UserDirectoryPort for InMemoryUserDirectory {
    async fn get_contact(&self, user_id: Uuid) -> AppResult<Option<UserContact>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|email| UserContact {
                user_id,
                email: email.clone(),
            }))
    }
}
