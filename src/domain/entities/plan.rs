use serde::{Deserialize, Serialize};

use crate::app_error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    /// GoCardless `interval_unit` value.
    pub fn to_provider_interval(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }
}

/// A statically configured plan. Not user-editable; loaded once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub amount_pence: i32,
    pub currency: String,
    pub interval: BillingInterval,
}

/// The fixed plan table plus the amount threshold used to infer a plan from a
/// webhook that carries only a payment amount.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    premium_threshold_pence: i32,
}

pub const BASIC_PLAN_ID: &str = "basic";
pub const PREMIUM_PLAN_ID: &str = "premium";

impl PlanCatalog {
    pub fn new(
        basic_price_pence: i32,
        premium_price_pence: i32,
        premium_threshold_pence: i32,
        currency: &str,
    ) -> AppResult<Self> {
        let catalog = Self {
            plans: vec![
                Plan {
                    id: BASIC_PLAN_ID.to_string(),
                    name: "Basic Plan".to_string(),
                    amount_pence: basic_price_pence,
                    currency: currency.to_string(),
                    interval: BillingInterval::Monthly,
                },
                Plan {
                    id: PREMIUM_PLAN_ID.to_string(),
                    name: "Premium Plan".to_string(),
                    amount_pence: premium_price_pence,
                    currency: currency.to_string(),
                    interval: BillingInterval::Monthly,
                },
            ],
            premium_threshold_pence,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Startup consistency check: the inference threshold must separate the
    /// two price points, otherwise amount tiering would contradict the
    /// catalog and silently assign the wrong plan.
    fn validate(&self) -> AppResult<()> {
        let basic = self.get(BASIC_PLAN_ID).unwrap();
        let premium = self.get(PREMIUM_PLAN_ID).unwrap();

        if basic.amount_pence <= 0 || premium.amount_pence <= 0 {
            return Err(AppError::InvalidInput(
                "plan prices must be positive".to_string(),
            ));
        }
        if basic.amount_pence >= self.premium_threshold_pence {
            return Err(AppError::InvalidInput(format!(
                "basic price {}p is not below the premium threshold {}p",
                basic.amount_pence, self.premium_threshold_pence
            )));
        }
        if premium.amount_pence < self.premium_threshold_pence {
            return Err(AppError::InvalidInput(format!(
                "premium price {}p is below the premium threshold {}p",
                premium.amount_pence, self.premium_threshold_pence
            )));
        }
        Ok(())
    }

    pub fn get(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    pub fn require(&self, plan_id: &str) -> AppResult<&Plan> {
        self.get(plan_id)
            .ok_or_else(|| AppError::InvalidPlan(plan_id.to_string()))
    }

    pub fn all(&self) -> &[Plan] {
        &self.plans
    }

    /// Best-effort plan from a payment amount. Missing or zero amounts fall
    /// back to basic rather than failing the event.
    pub fn infer_from_amount(&self, amount_pence: i32) -> &Plan {
        if amount_pence >= self.premium_threshold_pence {
            self.get(PREMIUM_PLAN_ID).unwrap()
        } else {
            self.get(BASIC_PLAN_ID).unwrap()
        }
    }
}
