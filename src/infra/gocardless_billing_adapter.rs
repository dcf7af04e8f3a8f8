use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::ports::billing_provider::{
        BillingProviderPort, CompletedFlow, CustomerId, FlowUrls, MandateId, ProviderSubscription,
        StartedFlow, SubscriptionId,
    },
    domain::entities::plan::Plan,
    infra::gocardless_client::{GoCardlessClient, GoCardlessEnvironment},
};

/// Adapter that wraps GoCardlessClient to implement BillingProviderPort.
///
/// Translates domain-action-based calls into the processor's two-step REST
/// surface (billing request, then billing request flow).
#[derive(Clone)]
pub struct GoCardlessBillingAdapter {
    client: GoCardlessClient,
}

impl GoCardlessBillingAdapter {
    pub fn new(access_token: SecretString, environment: GoCardlessEnvironment) -> Self {
        Self {
            client: GoCardlessClient::new(access_token, environment),
        }
    }
}

#[async_trait]
impl BillingProviderPort for GoCardlessBillingAdapter {
    async fn start_flow(
        &self,
        plan: &Plan,
        user_id: Uuid,
        customer_email: &str,
        urls: &FlowUrls,
    ) -> AppResult<StartedFlow> {
        // Metadata on the billing request travels back on webhook events, so
        // the reconciler can attribute them without extra lookups.
        let request = self
            .client
            .create_billing_request(
                plan.amount_pence,
                &plan.currency,
                &plan.name,
                &user_id.to_string(),
                &plan.id,
            )
            .await?;

        let flow = self
            .client
            .create_billing_request_flow(
                &request.id,
                &urls.redirect_uri,
                &urls.exit_uri,
                customer_email,
            )
            .await?;

        Ok(StartedFlow {
            flow_id: flow.id,
            authorisation_url: flow.authorisation_url,
        })
    }

    async fn fetch_flow(&self, flow_id: &str) -> AppResult<CompletedFlow> {
        let flow = self.client.get_billing_request_flow(flow_id).await?;

        let Some(billing_request_id) = flow.links.billing_request else {
            return Ok(CompletedFlow {
                billing_request_id: String::new(),
                customer_id: None,
                mandate_id: None,
            });
        };

        let request = self.client.get_billing_request(&billing_request_id).await?;

        Ok(CompletedFlow {
            billing_request_id,
            customer_id: request.links.customer.map(CustomerId),
            mandate_id: request.links.mandate_request_mandate.map(MandateId),
        })
    }

    async fn create_subscription(
        &self,
        plan: &Plan,
        mandate: &MandateId,
        user_id: Uuid,
    ) -> AppResult<ProviderSubscription> {
        let subscription = self
            .client
            .create_subscription(
                plan.amount_pence,
                &plan.currency,
                plan.interval.to_provider_interval(),
                mandate.as_str(),
                &user_id.to_string(),
                &plan.id,
            )
            .await?;

        let next_charge_date = subscription
            .upcoming_payments
            .first()
            .map(|p| p.charge_date.and_time(chrono::NaiveTime::MIN));

        Ok(ProviderSubscription {
            id: SubscriptionId(subscription.id),
            status: subscription.status,
            created_at: subscription.created_at.map(|t| t.naive_utc()),
            next_charge_date,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &SubscriptionId) -> AppResult<()> {
        self.client
            .cancel_subscription(subscription_id.as_str())
            .await?;
        Ok(())
    }
}
