//! Referral module - referral lifecycle and reward rules.

mod event;
mod reward;

pub use event::{RefereeCategory, ReferralEvent, ReferralStatus, ReferralValidation};
pub use reward::{credit_amount, RewardRole, REFEREE_REWARD_PERIODS, REFERRER_REWARD_PERIODS};
