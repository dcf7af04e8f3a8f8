//! Test app state builder for HTTP-level integration testing.
//!
//! Builds a minimal `AppState` backed entirely by in-memory mocks.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::billing_provider::CompletedFlow,
        use_cases::{
            billing_flow::BillingFlowUseCases, reconcile::ReconcileUseCases,
            subscription_status::SubscriptionStatusUseCases,
        },
    },
    domain::entities::subscription::Subscription,
    infra::{config::AppConfig, gocardless_client::GoCardlessEnvironment},
    test_utils::{
        InMemorySubscriptionRepo, InMemoryUserDirectory, StubBillingProvider,
        default_test_catalog,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

/// An `Authorization` header value for the given user, signed with the test
/// JWT secret.
pub fn test_bearer_token(user_id: Uuid) -> String {
    let token = jwt::issue(
        user_id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        time::Duration::hours(1),
    )
    .expect("test token must sign");
    format!("Bearer {}", token)
}

pub struct TestAppStateBuilder {
    subscriptions: Vec<Subscription>,
    users: Vec<(Uuid, String)>,
    flow: Option<CompletedFlow>,
    provider_status: Option<String>,
    failing_subscription_ids: Vec<String>,
    webhook_secret: String,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            subscriptions: vec![],
            users: vec![],
            flow: None,
            provider_status: None,
            failing_subscription_ids: vec![],
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        }
    }

    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_user(mut self, user_id: Uuid, email: &str) -> Self {
        self.users.push((user_id, email.to_string()));
        self
    }

    /// Override the flow the stub provider reports on completion.
    pub fn with_flow(mut self, flow: CompletedFlow) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Override the status the stub provider reports for new subscriptions.
    pub fn with_provider_status(mut self, status: &str) -> Self {
        self.provider_status = Some(status.to_string());
        self
    }

    /// Make repository lookups for this provider subscription id fail.
    pub fn with_failing_subscription_id(mut self, subscription_id: &str) -> Self {
        self.failing_subscription_ids
            .push(subscription_id.to_string());
        self
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = secret.to_string();
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_repo().0
    }

    /// Build the AppState and hand back the repo for assertions.
    pub fn build_with_repo(self) -> (AppState, Arc<InMemorySubscriptionRepo>) {
        let repo = Arc::new(InMemorySubscriptionRepo::with_subscriptions(
            self.subscriptions,
        ));
        for id in &self.failing_subscription_ids {
            repo.fail_on_subscription_id(id);
        }

        let directory = InMemoryUserDirectory::new();
        for (user_id, email) in &self.users {
            directory
                .users
                .lock()
                .unwrap()
                .insert(*user_id, email.clone());
        }
        let directory = Arc::new(directory);

        let mut provider = StubBillingProvider::default();
        if let Some(flow) = self.flow {
            provider = provider.with_flow(flow);
        }
        if let Some(status) = &self.provider_status {
            provider = provider.with_subscription_status(status);
        }
        let provider = Arc::new(provider);

        let catalog = Arc::new(default_test_catalog());

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            gocardless_access_token: SecretString::new("test_access_token".into()),
            gocardless_webhook_secret: SecretString::new(self.webhook_secret.into()),
            gocardless_environment: GoCardlessEnvironment::Sandbox,
            user_directory_url: Url::parse("http://localhost:3002").unwrap(),
            basic_price_pence: 999,
            premium_price_pence: 1999,
            premium_threshold_pence: 1699,
            plan_currency: "GBP".to_string(),
        });

        let flow_use_cases = Arc::new(BillingFlowUseCases::new(
            repo.clone(),
            provider,
            directory,
            catalog.clone(),
            config.app_origin.to_string().trim_end_matches('/').to_string(),
        ));
        let reconcile_use_cases = Arc::new(ReconcileUseCases::new(repo.clone(), catalog.clone()));
        let status_use_cases = Arc::new(SubscriptionStatusUseCases::new(repo.clone()));

        let app_state = AppState {
            config,
            flow_use_cases,
            reconcile_use_cases,
            status_use_cases,
            catalog,
        };

        (app_state, repo)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
