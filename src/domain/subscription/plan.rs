//! Plan tier derived from the gateway price identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Billing cadence of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Monthly,
    Annual,
}

impl PlanTier {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Monthly => "monthly",
            PlanTier::Annual => "annual",
        }
    }
}

impl Default for PlanTier {
    fn default() -> Self {
        PlanTier::Monthly
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PlanTier::Monthly),
            "annual" => Ok(PlanTier::Annual),
            other => Err(format!("unknown plan tier: {}", other)),
        }
    }
}
