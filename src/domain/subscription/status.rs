//! Subscription status as tracked internally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four statuses the engine records.
///
/// Gateway statuses outside this set are folded onto the nearest value by
/// [`SubscriptionStatus::from_gateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
}

impl SubscriptionStatus {
    /// Maps a raw gateway status string.
    ///
    /// Returns `None` for strings the gateway is not known to emit.
    pub fn from_gateway(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "trialing" => Some(Self::Trialing),
            "past_due" | "unpaid" | "incomplete" | "paused" => Some(Self::PastDue),
            "canceled" | "cancelled" | "incomplete_expired" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// True only for statuses that grant product access.
    pub fn grants_entitlement(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }

    /// True only for a paying subscription. Trials do not count.
    pub fn is_paying(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}
