use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::use_cases::{
        billing_flow::BillingFlowUseCases,
        reconcile::{ReconcileUseCases, SubscriptionRepo},
        subscription_status::SubscriptionStatusUseCases,
    },
    domain::entities::plan::PlanCatalog,
    infra::{
        config::AppConfig, db::init_db, gocardless_billing_adapter::GoCardlessBillingAdapter,
        user_directory::HttpUserDirectory,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    // A catalog that contradicts the inference threshold would silently
    // assign wrong plans, so refuse to start on one.
    let catalog = Arc::new(
        PlanCatalog::new(
            config.basic_price_pence,
            config.premium_price_pence,
            config.premium_threshold_pence,
            &config.plan_currency,
        )
        .map_err(|e| anyhow::anyhow!("Invalid plan configuration: {e}"))?,
    );

    let pool = init_db(&config.database_url).await?;
    let repo = Arc::new(PostgresPersistence::new(pool)) as Arc<dyn SubscriptionRepo>;

    let provider = Arc::new(GoCardlessBillingAdapter::new(
        config.gocardless_access_token.clone(),
        config.gocardless_environment,
    ));
    let directory = Arc::new(HttpUserDirectory::new(config.user_directory_url.clone()));

    let app_origin = config.app_origin.to_string();
    let app_origin = app_origin.trim_end_matches('/').to_string();

    let flow_use_cases = Arc::new(BillingFlowUseCases::new(
        repo.clone(),
        provider,
        directory,
        catalog.clone(),
        app_origin,
    ));
    let reconcile_use_cases = Arc::new(ReconcileUseCases::new(repo.clone(), catalog.clone()));
    let status_use_cases = Arc::new(SubscriptionStatusUseCases::new(repo));

    Ok(AppState {
        config: Arc::new(config),
        flow_use_cases,
        reconcile_use_cases,
        status_use_cases,
        catalog,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "finboard_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
