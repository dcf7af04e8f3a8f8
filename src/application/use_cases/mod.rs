pub mod billing_flow;
pub mod reconcile;
pub mod subscription_status;
