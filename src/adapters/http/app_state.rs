use std::sync::Arc;

use crate::{
    application::use_cases::{
        billing_flow::BillingFlowUseCases, reconcile::ReconcileUseCases,
        subscription_status::SubscriptionStatusUseCases,
    },
    domain::entities::plan::PlanCatalog,
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub flow_use_cases: Arc<BillingFlowUseCases>,
    pub reconcile_use_cases: Arc<ReconcileUseCases>,
    pub status_use_cases: Arc<SubscriptionStatusUseCases>,
    pub catalog: Arc<PlanCatalog>,
}
