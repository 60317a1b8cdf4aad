//! Verified event envelope.
//!
//! Only the fields the engine acts on are captured. Everything else in the
//! gateway's event schema is ignored.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

/// Event kinds the dispatcher routes. Anything else lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum EventKind {
    CheckoutSessionCompleted,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentFailed,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for EventKind {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated gateway event.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    #[serde(rename = "type", alias = "kind")]
    pub kind: EventKind,

    /// Unix timestamp of event creation.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub data: EventData,

    #[serde(default)]
    pub livemode: bool,
}

/// Container for the event-specific object. A missing object decodes as
/// `null` and fails later, per handler, when a typed object is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

impl GatewayEvent {
    /// Decodes an envelope from the raw (already authenticated) body.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Deserializes the data object as the specified type.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }
}
