//! Account module - the slice of a user account this engine reads and writes.
//!
//! Accounts are created by the identity subsystem. The engine only touches
//! the billing identity, the entitlement flag and the accrued reward balance.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::AccountId;

/// A user account as seen by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: AccountId,
    pub email: String,
    /// External billing identity (gateway customer id), once known.
    pub billing_customer_id: Option<String>,
    /// Gates product access. Mirrors the last observed subscription status.
    pub entitled: bool,
    /// Reward periods owed but not yet issued as an external credit.
    pub accrued_reward_periods: u32,
}

impl UserAccount {
    /// Creates an account with no billing identity and nothing accrued.
    pub fn new(id: AccountId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            billing_customer_id: None,
            entitled: false,
            accrued_reward_periods: 0,
        }
    }

    /// Sets the billing identity.
    pub fn with_billing_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.billing_customer_id = Some(customer_id.into());
        self
    }

    /// Sets the accrued reward balance.
    pub fn with_accrued_reward_periods(mut self, periods: u32) -> Self {
        self.accrued_reward_periods = periods;
        self
    }

    /// True when stored rewards can be flushed to the gateway.
    pub fn has_flushable_rewards(&self) -> bool {
        self.billing_customer_id.is_some() && self.accrued_reward_periods > 0
    }
}
