//! Reward amounts and gateway idempotency keys.

use std::fmt;

use crate::domain::foundation::ReferralEventId;

/// Reward periods granted to the referrer of a validated entrepreneur.
pub const REFERRER_REWARD_PERIODS: u32 = 3;

/// Reward periods granted to the entrepreneur who was referred.
pub const REFEREE_REWARD_PERIODS: u32 = 2;

/// Which side of a referral a credit is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardRole {
    Referrer,
    Referee,
}

impl RewardRole {
    /// Number of reward periods this role earns.
    pub fn periods(&self) -> u32 {
        match self {
            Self::Referrer => REFERRER_REWARD_PERIODS,
            Self::Referee => REFEREE_REWARD_PERIODS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Referrer => "referrer",
            Self::Referee => "referee",
        }
    }

    /// Gateway idempotency key for this role's credit on a given referral.
    ///
    /// Stable across redeliveries, so the gateway collapses repeated attempts.
    pub fn idempotency_key(&self, event_id: &ReferralEventId) -> String {
        format!("referral:{}:{}", event_id, self.as_str())
    }

    /// Human-readable description attached to the balance transaction.
    pub fn description(&self) -> String {
        match self {
            Self::Referrer => format!("Referral reward: {} free months", self.periods()),
            Self::Referee => format!("Welcome reward: {} free months", self.periods()),
        }
    }
}

impl fmt::Display for RewardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monetary value of `periods` reward periods, in the smallest currency unit.
pub fn credit_amount(periods: u32, period_value: i64) -> i64 {
    i64::from(periods).saturating_mul(period_value)
}
