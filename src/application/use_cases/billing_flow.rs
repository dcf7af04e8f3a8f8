//! Flow Initiator: starts the hosted authorization flow with the payment
//! processor and finalizes a mandate into an active subscription when the
//! user returns.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            billing_provider::{BillingProviderPort, FlowUrls, StartedFlow, SubscriptionId},
            user_directory::UserDirectoryPort,
        },
        use_cases::reconcile::{FlowSubscriptionInput, SubscriptionRepo},
    },
    domain::entities::{
        plan::PlanCatalog,
        subscription::{Subscription, SubscriptionStatus},
    },
};

#[derive(Clone)]
pub struct BillingFlowUseCases {
    repo: Arc<dyn SubscriptionRepo>,
    provider: Arc<dyn BillingProviderPort>,
    directory: Arc<dyn UserDirectoryPort>,
    catalog: Arc<PlanCatalog>,
    app_origin: String,
}

impl BillingFlowUseCases {
    pub fn new(
        repo: Arc<dyn SubscriptionRepo>,
        provider: Arc<dyn BillingProviderPort>,
        directory: Arc<dyn UserDirectoryPort>,
        catalog: Arc<PlanCatalog>,
        app_origin: String,
    ) -> Self {
        Self {
            repo,
            provider,
            directory,
            catalog,
            app_origin,
        }
    }

    /// Start the authorization flow for a (user, plan) pair. Returns the
    /// hosted page URL to redirect the user to.
    pub async fn start_flow(&self, user_id: Uuid, plan_id: &str) -> AppResult<StartedFlow> {
        let plan = self.catalog.require(plan_id)?;

        let contact = self
            .directory
            .get_contact(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let urls = FlowUrls {
            redirect_uri: format!("{}/api/billing/callback", self.app_origin),
            exit_uri: format!("{}/dashboard", self.app_origin),
        };

        let flow = self
            .provider
            .start_flow(plan, user_id, &contact.email, &urls)
            .await?;

        tracing::info!(
            user_id = %user_id,
            plan_id,
            flow_id = %flow.flow_id,
            "Started billing authorization flow"
        );

        Ok(flow)
    }

    /// Finalize the flow after the user returns from the hosted page.
    ///
    /// Races with the webhook path for the same subscription: both converge
    /// because the upsert is keyed by `user_id` and the webhook path only
    /// touches records it can resolve.
    pub async fn complete_flow(
        &self,
        flow_id: &str,
        user_id: Uuid,
        plan_id: &str,
    ) -> AppResult<Subscription> {
        let plan = self.catalog.require(plan_id)?;

        let flow = self.provider.fetch_flow(flow_id).await?;
        // The user may have abandoned or failed the hosted authorization; in
        // that case no record is created or mutated.
        let (Some(customer_id), Some(mandate_id)) = (flow.customer_id, flow.mandate_id) else {
            return Err(AppError::FlowIncomplete);
        };

        let subscription = self
            .provider
            .create_subscription(plan, &mandate_id, user_id)
            .await?;

        let status = if subscription.status == "active" {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Pending
        };

        let input = FlowSubscriptionInput {
            user_id,
            gocardless_customer_id: customer_id.0,
            gocardless_mandate_id: mandate_id.0,
            gocardless_subscription_id: subscription.id.0.clone(),
            plan_id: plan.id.clone(),
            amount_pence: plan.amount_pence,
            currency: plan.currency.clone(),
            status,
            started_at: subscription.created_at,
            next_payment_date: subscription.next_charge_date,
        };

        let record = self.repo.upsert_from_flow(&input).await?;

        tracing::info!(
            user_id = %user_id,
            plan_id,
            subscription_id = %subscription.id,
            status = record.status.as_str(),
            "Completed billing flow"
        );

        Ok(record)
    }

    /// User-initiated cancellation: cancel at the processor first, then mark
    /// the record. The webhook for the same cancellation may arrive later and
    /// is a no-op.
    pub async fn cancel(&self, user_id: Uuid) -> AppResult<()> {
        let record = self
            .repo
            .get_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(user_id.to_string()))?;

        let Some(subscription_id) = record.gocardless_subscription_id else {
            return Err(AppError::SubscriptionNotFound(user_id.to_string()));
        };

        self.provider
            .cancel_subscription(&SubscriptionId(subscription_id))
            .await?;
        self.repo.cancel_by_user(user_id).await?;

        tracing::info!(user_id = %user_id, "Cancelled subscription");
        Ok(())
    }
}
