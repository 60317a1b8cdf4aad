//! Referral validation: promote the referee's pending referral.

use std::sync::Arc;

use crate::domain::foundation::AccountId;
use crate::domain::referral::REFERRER_REWARD_PERIODS;
use crate::ports::ReferralLedger;

use super::step_report::{ReconcileReport, Step, StepOutcome};

pub struct ReferralValidator {
    ledger: Arc<dyn ReferralLedger>,
}

impl ReferralValidator {
    pub fn new(ledger: Arc<dyn ReferralLedger>) -> Self {
        Self { ledger }
    }

    /// Validates the referee's pending referral, if any.
    ///
    /// Safe to repeat: a second call finds nothing pending. Returns `false`
    /// only when the store call itself failed.
    pub async fn validate(&self, referee_id: AccountId, report: &mut ReconcileReport) -> bool {
        match self
            .ledger
            .validate_pending(&referee_id, REFERRER_REWARD_PERIODS)
            .await
        {
            Ok(Some(validation)) => {
                tracing::info!(
                    referral_event_id = %validation.event_id,
                    referee_id = %referee_id,
                    referrer_id = %validation.referrer_id,
                    category = %validation.category,
                    referrer_reward_deferred = validation.referrer_reward_deferred,
                    "Referral validated"
                );
                report.record(Step::ValidateReferral, StepOutcome::Applied);
                true
            }
            Ok(None) => {
                report.record(
                    Step::ValidateReferral,
                    StepOutcome::skipped("no pending referral"),
                );
                true
            }
            Err(e) => {
                report.record(Step::ValidateReferral, StepOutcome::Failed(e.into()));
                false
            }
        }
    }
}
