//! Referral event and its one-directional lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AccountId, ReferralEventId, Timestamp};

/// Class of the referred user.
///
/// Only entrepreneurs are credited per event. Customer referrals are rewarded
/// through a separate batch process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefereeCategory {
    Entrepreneur,
    Customer,
}

impl RefereeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entrepreneur => "entrepreneur",
            Self::Customer => "customer",
        }
    }

    /// True if this category earns per-event external credits.
    pub fn earns_event_credit(&self) -> bool {
        matches!(self, Self::Entrepreneur)
    }
}

impl fmt::Display for RefereeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefereeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrepreneur" => Ok(Self::Entrepreneur),
            "customer" => Ok(Self::Customer),
            other => Err(format!("unknown referee category: {}", other)),
        }
    }
}

/// Validation status. Moves pending to validated once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Validated,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            other => Err(format!("unknown referral status: {}", other)),
        }
    }
}

/// A referrer/referee pair tracked through validation and crediting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEvent {
    pub id: ReferralEventId,
    pub referrer_id: AccountId,
    pub referee_id: AccountId,
    pub category: RefereeCategory,
    pub status: ReferralStatus,
    pub credited: bool,
    /// Set at validation when the referrer reward went to the accrued
    /// balance instead of an external credit.
    pub referrer_reward_deferred: bool,
    pub created_at: Timestamp,
    pub validated_at: Option<Timestamp>,
}

impl ReferralEvent {
    /// Creates a pending, uncredited referral.
    pub fn pending(referrer_id: AccountId, referee_id: AccountId, category: RefereeCategory) -> Self {
        Self {
            id: ReferralEventId::new(),
            referrer_id,
            referee_id,
            category,
            status: ReferralStatus::Pending,
            credited: false,
            referrer_reward_deferred: false,
            created_at: Timestamp::now(),
            validated_at: None,
        }
    }

    /// True when the credit step may still run for this event.
    pub fn awaiting_credit(&self) -> bool {
        self.status == ReferralStatus::Validated && !self.credited
    }
}

/// Outcome of a successful pending-to-validated transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralValidation {
    pub event_id: ReferralEventId,
    pub referrer_id: AccountId,
    pub category: RefereeCategory,
    pub referrer_reward_deferred: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_referral_is_not_awaiting_credit() {
        let event = ReferralEvent::pending(
            AccountId::new(),
            AccountId::new(),
            RefereeCategory::Entrepreneur,
        );
        assert_eq!(event.status, ReferralStatus::Pending);
        assert!(!event.awaiting_credit());
    }

    #[test]
    fn validated_uncredited_referral_is_awaiting_credit() {
        let mut event =
            ReferralEvent::pending(AccountId::new(), AccountId::new(), RefereeCategory::Customer);
        event.status = ReferralStatus::Validated;
        assert!(event.awaiting_credit());

        event.credited = true;
        assert!(!event.awaiting_credit());
    }

    #[test]
    fn only_entrepreneurs_earn_event_credit() {
        assert!(RefereeCategory::Entrepreneur.earns_event_credit());
        assert!(!RefereeCategory::Customer.earns_event_credit());
    }

    #[test]
    fn category_parses_storage_values() {
        assert_eq!(
            "entrepreneur".parse::<RefereeCategory>().unwrap(),
            RefereeCategory::Entrepreneur
        );
        assert!("partner".parse::<RefereeCategory>().is_err());
    }
}
