//! Webhook event normalization and the subscription reconciliation state
//! machine.
//!
//! Events arrive at least once and possibly out of order. Every transition
//! here is a pure function of `(current status, event)` applied as a single
//! conditional update scoped by the processor's own identifier, so duplicate
//! and reordered deliveries are commutative without any per-subscription
//! locking.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        plan::PlanCatalog,
        subscription::{PlanSource, Subscription, SubscriptionStatus},
        webhook_event::{
            EventSubject, NormalizedEvent, ResourceType, WebhookEnvelope, WebhookPayload,
        },
    },
};

// ============================================================================
// State Store port
// ============================================================================

/// Fields written when a plan is assigned to a record.
#[derive(Debug, Clone)]
pub struct PlanAssignment {
    pub plan_id: String,
    pub amount_pence: i32,
    pub currency: String,
    pub source: PlanSource,
}

/// Everything the authoritative flow-completion path knows about a
/// subscription. Upserted by `user_id`; one row per user.
#[derive(Debug, Clone)]
pub struct FlowSubscriptionInput {
    pub user_id: Uuid,
    pub gocardless_customer_id: String,
    pub gocardless_mandate_id: String,
    pub gocardless_subscription_id: String,
    pub plan_id: String,
    pub amount_pence: i32,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub started_at: Option<chrono::NaiveDateTime>,
    pub next_payment_date: Option<chrono::NaiveDateTime>,
}

/// The single source of truth for subscription state.
///
/// Mutating methods are targeted updates filtered by an external identifier
/// and return the number of rows they touched; they never read-modify-write.
/// Activation-style writes must exclude terminal records so a late duplicate
/// `created` can never resurrect a cancellation.
#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;

    async fn get_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;

    /// Insert or fully replace the user's record from a completed flow.
    /// A new flow carries a fresh mandate and subscription, so this path may
    /// overwrite a previously cancelled record (re-subscription).
    async fn upsert_from_flow(&self, input: &FlowSubscriptionInput) -> AppResult<Subscription>;

    /// `status -> active`, set `started_at` if unset, and assign the plan
    /// only when none is recorded yet. Skips terminal records.
    async fn mark_active_by_subscription_id(
        &self,
        subscription_id: &str,
        plan: Option<&PlanAssignment>,
    ) -> AppResult<u64>;

    /// Targeted status write scoped by the external subscription id.
    /// `cancelled` always wins; `expired` yields only to `cancelled`; other
    /// statuses skip terminal records.
    async fn set_status_by_subscription_id(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64>;

    /// Cancel every record referencing the mandate.
    async fn cancel_by_mandate_id(&self, mandate_id: &str) -> AppResult<u64>;

    /// Cancel the user's record (user-initiated cancellation path).
    async fn cancel_by_user(&self, user_id: Uuid) -> AppResult<u64>;
}

// ============================================================================
// Event Normalizer
// ============================================================================

/// Map processor envelopes to internal events, preserving input order.
/// Unknown resource types pass through as `Other`; deduplication is not done
/// here, the transitions themselves are idempotent.
pub fn normalize(payload: WebhookPayload) -> Vec<NormalizedEvent> {
    payload.events.into_iter().filter_map(normalize_one).collect()
}

fn normalize_one(envelope: WebhookEnvelope) -> Option<NormalizedEvent> {
    let subject = match ResourceType::from_wire(&envelope.resource_type) {
        ResourceType::Subscriptions => {
            let Some(subscription_id) = envelope.links.subscription else {
                tracing::warn!(
                    action = %envelope.action,
                    "Subscription event without a subscription link, dropping"
                );
                return None;
            };
            EventSubject::Subscription { subscription_id }
        }
        ResourceType::Payments => {
            let Some(payment_id) = envelope.links.payment else {
                tracing::warn!(
                    action = %envelope.action,
                    "Payment event without a payment link, dropping"
                );
                return None;
            };
            EventSubject::Payment {
                payment_id,
                subscription_id: envelope.links.subscription,
            }
        }
        ResourceType::Mandates => {
            let Some(mandate_id) = envelope.links.mandate else {
                tracing::warn!(
                    action = %envelope.action,
                    "Mandate event without a mandate link, dropping"
                );
                return None;
            };
            EventSubject::Mandate { mandate_id }
        }
        ResourceType::Other => {
            tracing::info!(
                resource_type = %envelope.resource_type,
                action = %envelope.action,
                "Unhandled webhook resource type"
            );
            EventSubject::Other {
                resource_type: envelope.resource_type,
            }
        }
    };

    Some(NormalizedEvent {
        subject,
        action: envelope.action,
        metadata: envelope.metadata,
    })
}

// ============================================================================
// Reconciler
// ============================================================================

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A conditional write was issued (it may still have been a no-op write
    /// if the record was already in the target state).
    Applied,
    /// The event carries no state change (informational actions).
    Informational,
    /// The event's subject could not be resolved to a record; logged and
    /// dropped, never fatal.
    Skipped,
}

/// Result of processing a full webhook batch. Events fail independently; one
/// failure never aborts its siblings.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    pub informational: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Clone)]
pub struct ReconcileUseCases {
    repo: Arc<dyn SubscriptionRepo>,
    catalog: Arc<PlanCatalog>,
}

impl ReconcileUseCases {
    pub fn new(repo: Arc<dyn SubscriptionRepo>, catalog: Arc<PlanCatalog>) -> Self {
        Self { repo, catalog }
    }

    /// Apply every event in delivery order. A failed event is logged and
    /// counted; the rest of the batch still runs, and the caller reports the
    /// failure so the processor redelivers the whole batch.
    pub async fn apply_batch(&self, events: &[NormalizedEvent]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for event in events {
            match self.apply(event).await {
                Ok(EventOutcome::Applied) => outcome.applied += 1,
                Ok(EventOutcome::Informational) => outcome.informational += 1,
                Ok(EventOutcome::Skipped) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        action = %event.action,
                        subject = ?event.subject,
                        "Failed to apply webhook event, continuing with batch"
                    );
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Apply a single normalized event. Idempotent: applying the same event
    /// twice yields the same record as applying it once.
    pub async fn apply(&self, event: &NormalizedEvent) -> AppResult<EventOutcome> {
        match &event.subject {
            EventSubject::Subscription { subscription_id } => {
                self.apply_subscription_event(subscription_id, event).await
            }
            EventSubject::Payment {
                payment_id,
                subscription_id,
            } => {
                self.apply_payment_event(payment_id, subscription_id.as_deref(), event)
                    .await
            }
            EventSubject::Mandate { mandate_id } => {
                self.apply_mandate_event(mandate_id, event).await
            }
            EventSubject::Other { resource_type } => {
                tracing::info!(
                    resource_type = %resource_type,
                    action = %event.action,
                    "Ignoring event for unknown resource type"
                );
                Ok(EventOutcome::Informational)
            }
        }
    }

    async fn apply_subscription_event(
        &self,
        subscription_id: &str,
        event: &NormalizedEvent,
    ) -> AppResult<EventOutcome> {
        match event.action.as_str() {
            "created" | "confirmed" => {
                let Some(record) = self
                    .repo
                    .get_by_provider_subscription_id(subscription_id)
                    .await?
                else {
                    return Ok(self.skip_unknown(subscription_id, event));
                };

                // Plan inference is a fallback for records that never went
                // through the flow path; the flow's own plan is authoritative.
                let assignment = self.infer_plan_if_unknown(&record, event);
                self.repo
                    .mark_active_by_subscription_id(subscription_id, assignment.as_ref())
                    .await?;
                Ok(EventOutcome::Applied)
            }
            "cancelled" => {
                self.set_status_if_known(subscription_id, SubscriptionStatus::Cancelled, event)
                    .await
            }
            "finished" => {
                self.set_status_if_known(subscription_id, SubscriptionStatus::Expired, event)
                    .await
            }
            other => {
                tracing::debug!(
                    subscription_id,
                    action = other,
                    "Informational subscription event"
                );
                Ok(EventOutcome::Informational)
            }
        }
    }

    async fn apply_payment_event(
        &self,
        payment_id: &str,
        subscription_id: Option<&str>,
        event: &NormalizedEvent,
    ) -> AppResult<EventOutcome> {
        let status = match event.action.as_str() {
            // A successful collection reaffirms an active subscription.
            "confirmed" => SubscriptionStatus::Active,
            "failed" => SubscriptionStatus::PastDue,
            other => {
                tracing::debug!(payment_id, action = other, "Informational payment event");
                return Ok(EventOutcome::Informational);
            }
        };

        let Some(subscription_id) = subscription_id else {
            // One-off payment, nothing to reconcile against.
            tracing::debug!(payment_id, "Payment event without a subscription link");
            return Ok(EventOutcome::Informational);
        };

        self.set_status_if_known(subscription_id, status, event).await
    }

    async fn apply_mandate_event(
        &self,
        mandate_id: &str,
        event: &NormalizedEvent,
    ) -> AppResult<EventOutcome> {
        match event.action.as_str() {
            "cancelled" | "failed" => {
                let touched = self.repo.cancel_by_mandate_id(mandate_id).await?;
                if touched == 0 {
                    tracing::info!(
                        mandate_id,
                        action = %event.action,
                        "Mandate event references no known records, skipping"
                    );
                    return Ok(EventOutcome::Skipped);
                }
                tracing::info!(
                    mandate_id,
                    records = touched,
                    "Cancelled subscriptions for revoked mandate"
                );
                Ok(EventOutcome::Applied)
            }
            "created" | "submitted" | "active" => {
                tracing::info!(mandate_id, action = %event.action, "Mandate lifecycle event");
                Ok(EventOutcome::Informational)
            }
            other => {
                tracing::debug!(mandate_id, action = other, "Informational mandate event");
                Ok(EventOutcome::Informational)
            }
        }
    }

    async fn set_status_if_known(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
        event: &NormalizedEvent,
    ) -> AppResult<EventOutcome> {
        if self
            .repo
            .get_by_provider_subscription_id(subscription_id)
            .await?
            .is_none()
        {
            return Ok(self.skip_unknown(subscription_id, event));
        }
        self.repo
            .set_status_by_subscription_id(subscription_id, status)
            .await?;
        Ok(EventOutcome::Applied)
    }

    fn infer_plan_if_unknown(
        &self,
        record: &Subscription,
        event: &NormalizedEvent,
    ) -> Option<PlanAssignment> {
        let amount = event.amount_pence().unwrap_or(0);
        let inferred = self.catalog.infer_from_amount(amount);

        if let (Some(known), Some(PlanSource::Flow)) = (&record.plan_id, record.plan_source) {
            if amount > 0 && known != &inferred.id {
                // Two sources of truth disagree; the flow path wins but the
                // mismatch is worth surfacing.
                tracing::warn!(
                    recorded_plan = %known,
                    inferred_plan = %inferred.id,
                    amount_pence = amount,
                    "Webhook amount tiering disagrees with flow-recorded plan"
                );
            }
            return None;
        }

        if record.plan_id.is_some() {
            return None;
        }

        Some(PlanAssignment {
            plan_id: inferred.id.clone(),
            amount_pence: if amount > 0 { amount } else { inferred.amount_pence },
            currency: inferred.currency.clone(),
            source: PlanSource::AmountInference,
        })
    }

    fn skip_unknown(&self, subscription_id: &str, event: &NormalizedEvent) -> EventOutcome {
        // Legitimately happens when the webhook races the initial insert or
        // the record was created out of band.
        tracing::info!(
            subscription_id,
            action = %event.action,
            "Event references an unknown subscription, skipping"
        );
        EventOutcome::Skipped
    }
}
