use std::collections::HashMap;

use serde::Deserialize;

// ============================================================================
// Wire format
// ============================================================================

/// The body of a webhook delivery: a batch of event envelopes.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Kept as the raw wire string so unrecognized types can be logged
    /// verbatim; classify with [`ResourceType::from_wire`].
    pub resource_type: String,
    pub action: String,
    #[serde(default)]
    pub links: EventLinks,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// GoCardless resource types we act on. New types the processor adds later
/// classify as `Other` and are logged instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Subscriptions,
    Payments,
    Mandates,
    Other,
}

impl ResourceType {
    pub fn from_wire(resource_type: &str) -> Self {
        match resource_type {
            "subscriptions" => ResourceType::Subscriptions,
            "payments" => ResourceType::Payments,
            "mandates" => ResourceType::Mandates,
            _ => ResourceType::Other,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventLinks {
    pub subscription: Option<String>,
    pub payment: Option<String>,
    pub mandate: Option<String>,
    pub customer: Option<String>,
}

// ============================================================================
// Normalized form
// ============================================================================

/// A processor event mapped to an internal, resource-agnostic record.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub subject: EventSubject,
    pub action: String,
    pub metadata: HashMap<String, String>,
}

/// Closed tagged union over the event's subject resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSubject {
    Subscription {
        subscription_id: String,
    },
    Payment {
        payment_id: String,
        subscription_id: Option<String>,
    },
    Mandate {
        mandate_id: String,
    },
    /// Forward-compatibility catch-all; carried through for logging only.
    Other {
        resource_type: String,
    },
}

impl NormalizedEvent {
    /// The external subscription id this event reconciles against, if any.
    pub fn subscription_id(&self) -> Option<&str> {
        match &self.subject {
            EventSubject::Subscription { subscription_id } => Some(subscription_id),
            EventSubject::Payment {
                subscription_id, ..
            } => subscription_id.as_deref(),
            _ => None,
        }
    }

    /// The payment amount in minor units, when the processor included one in
    /// the event metadata.
    pub fn amount_pence(&self) -> Option<i32> {
        self.metadata.get("amount").and_then(|a| a.parse().ok())
    }
}
