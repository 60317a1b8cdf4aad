//! Referral reward configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    /// Value of one reward period in the smallest currency unit
    pub reward_period_value: i64,
}

impl RewardsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reward_period_value <= 0 {
            return Err(ValidationError::InvalidRewardValue);
        }
        Ok(())
    }
}
