//! The per-account subscription row.

use serde::{Deserialize, Serialize};

use super::{PlanTier, SubscriptionStatus};
use crate::domain::foundation::{AccountId, Timestamp};

/// One subscription per account, keyed by `account_id`.
///
/// Writes always replace the whole row so redelivered events converge on
/// the same state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub account_id: AccountId,
    pub external_subscription_id: String,
    pub billing_customer_id: Option<String>,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<Timestamp>,
}

impl SubscriptionRecord {
    /// Returns true if this subscription should grant product access.
    pub fn grants_entitlement(&self) -> bool {
        self.status.grants_entitlement()
    }
}
