//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    plan::PlanCatalog,
    subscription::{PlanSource, Subscription, SubscriptionStatus},
};

/// Create a test subscription record with sensible defaults: a pending
/// flow-sourced basic plan with all processor identifiers present.
pub fn create_test_subscription(overrides: impl FnOnce(&mut Subscription)) -> Subscription {
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        gocardless_customer_id: Some("CU123".to_string()),
        gocardless_mandate_id: Some("MD123".to_string()),
        gocardless_subscription_id: Some("SB123".to_string()),
        plan_id: Some("basic".to_string()),
        plan_source: Some(PlanSource::Flow),
        status: SubscriptionStatus::Pending,
        amount_pence: Some(999),
        currency: Some("GBP".to_string()),
        started_at: None,
        cancelled_at: None,
        next_payment_date: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut subscription);
    subscription
}

/// The catalog used throughout the tests: basic at 9.99, premium at 19.99,
/// premium inferred from 16.99 upward.
pub fn default_test_catalog() -> PlanCatalog {
    PlanCatalog::new(999, 1999, 1699, "GBP").expect("test catalog must validate")
}

/// A fixed datetime for deterministic test data.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .expect("valid timestamp")
        .naive_utc()
}
