//! Postgres implementation of the subscription store.
//!
//! Every mutation is a single conditional statement scoped by an external
//! identifier, so concurrent webhook deliveries and the flow completion path
//! serialize at the row level without explicit locking.

use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::reconcile::{FlowSubscriptionInput, PlanAssignment, SubscriptionRepo},
    domain::entities::subscription::{PlanSource, Subscription, SubscriptionStatus},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        gocardless_customer_id: row.get("gocardless_customer_id"),
        gocardless_mandate_id: row.get("gocardless_mandate_id"),
        gocardless_subscription_id: row.get("gocardless_subscription_id"),
        plan_id: row.get("plan_id"),
        plan_source: row.get::<Option<PlanSource>, _>("plan_source"),
        status: row.get("status"),
        amount_pence: row.get("amount_pence"),
        currency: row.get("currency"),
        started_at: row.get("started_at"),
        cancelled_at: row.get("cancelled_at"),
        next_payment_date: row.get("next_payment_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, gocardless_customer_id, gocardless_mandate_id,
    gocardless_subscription_id, plan_id, plan_source, status, amount_pence,
    currency, started_at, cancelled_at, next_payment_date, created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_by_provider_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE gocardless_subscription_id = $1",
            SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn upsert_from_flow(&self, input: &FlowSubscriptionInput) -> AppResult<Subscription> {
        // Full overwrite on conflict: a completed flow carries a fresh mandate
        // and subscription, so a previously cancelled row is replaced
        // (re-subscription).
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                user_id, gocardless_customer_id, gocardless_mandate_id,
                gocardless_subscription_id, plan_id, plan_source, status,
                amount_pence, currency, started_at, cancelled_at, next_payment_date
            )
            VALUES ($1, $2, $3, $4, $5, 'flow', $6, $7, $8, $9, NULL, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                gocardless_customer_id = EXCLUDED.gocardless_customer_id,
                gocardless_mandate_id = EXCLUDED.gocardless_mandate_id,
                gocardless_subscription_id = EXCLUDED.gocardless_subscription_id,
                plan_id = EXCLUDED.plan_id,
                plan_source = EXCLUDED.plan_source,
                status = EXCLUDED.status,
                amount_pence = EXCLUDED.amount_pence,
                currency = EXCLUDED.currency,
                started_at = EXCLUDED.started_at,
                cancelled_at = NULL,
                next_payment_date = EXCLUDED.next_payment_date,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.user_id)
        .bind(&input.gocardless_customer_id)
        .bind(&input.gocardless_mandate_id)
        .bind(&input.gocardless_subscription_id)
        .bind(&input.plan_id)
        .bind(input.status)
        .bind(input.amount_pence)
        .bind(&input.currency)
        .bind(input.started_at)
        .bind(input.next_payment_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_subscription(&row))
    }

    async fn mark_active_by_subscription_id(
        &self,
        subscription_id: &str,
        plan: Option<&PlanAssignment>,
    ) -> AppResult<u64> {
        let result = match plan {
            Some(plan) => {
                sqlx::query(
                    r#"
                    UPDATE subscriptions SET
                        status = 'active',
                        started_at = COALESCE(started_at, NOW()),
                        plan_id = COALESCE(plan_id, $2),
                        plan_source = CASE WHEN plan_id IS NULL THEN $3 ELSE plan_source END,
                        amount_pence = CASE WHEN plan_id IS NULL THEN $4 ELSE amount_pence END,
                        currency = CASE WHEN plan_id IS NULL THEN $5 ELSE currency END,
                        updated_at = NOW()
                    WHERE gocardless_subscription_id = $1
                      AND status NOT IN ('cancelled', 'expired')
                    "#,
                )
                .bind(subscription_id)
                .bind(&plan.plan_id)
                .bind(plan.source)
                .bind(plan.amount_pence)
                .bind(&plan.currency)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE subscriptions SET
                        status = 'active',
                        started_at = COALESCE(started_at, NOW()),
                        updated_at = NOW()
                    WHERE gocardless_subscription_id = $1
                      AND status NOT IN ('cancelled', 'expired')
                    "#,
                )
                .bind(subscription_id)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn set_status_by_subscription_id(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        // Status-specific guards: cancellation always wins, expiry yields
        // only to cancellation, everything else skips terminal rows.
        let result = match status {
            SubscriptionStatus::Cancelled => {
                sqlx::query(
                    r#"
                    UPDATE subscriptions SET
                        status = 'cancelled',
                        cancelled_at = COALESCE(cancelled_at, NOW()),
                        updated_at = NOW()
                    WHERE gocardless_subscription_id = $1
                    "#,
                )
                .bind(subscription_id)
                .execute(&self.pool)
                .await
            }
            SubscriptionStatus::Expired => {
                sqlx::query(
                    r#"
                    UPDATE subscriptions SET
                        status = 'expired',
                        updated_at = NOW()
                    WHERE gocardless_subscription_id = $1
                      AND status <> 'cancelled'
                    "#,
                )
                .bind(subscription_id)
                .execute(&self.pool)
                .await
            }
            _ => {
                sqlx::query(
                    r#"
                    UPDATE subscriptions SET
                        status = $2,
                        updated_at = NOW()
                    WHERE gocardless_subscription_id = $1
                      AND status NOT IN ('cancelled', 'expired')
                    "#,
                )
                .bind(subscription_id)
                .bind(status)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn cancel_by_mandate_id(&self, mandate_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = COALESCE(cancelled_at, NOW()),
                updated_at = NOW()
            WHERE gocardless_mandate_id = $1
            "#,
        )
        .bind(mandate_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn cancel_by_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = COALESCE(cancelled_at, NOW()),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }
}
