//! Credit Applicator.
//!
//! Issues referral rewards as gateway balance credits. The `credited` flag
//! is the idempotency gate: once it is set, no later delivery reaches the
//! crediting branch. Every credit carries a deterministic idempotency key
//! so a retried attempt is collapsed by the gateway.

use std::sync::Arc;

use crate::domain::foundation::AccountId;
use crate::domain::referral::{credit_amount, ReferralEvent, RewardRole};
use crate::ports::{AccountStore, BalanceCreditRequest, PaymentGateway, ReferralLedger};

use super::reconcile_error::ReconcileError;
use super::step_report::{ReconcileReport, Step, StepOutcome};

pub struct CreditApplicator {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn ReferralLedger>,
    gateway: Arc<dyn PaymentGateway>,
    reward_period_value: i64,
}

impl CreditApplicator {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn ReferralLedger>,
        gateway: Arc<dyn PaymentGateway>,
        reward_period_value: i64,
    ) -> Self {
        Self {
            accounts,
            ledger,
            gateway,
            reward_period_value,
        }
    }

    /// Credits both parties of the referee's validated, uncredited referral.
    ///
    /// Both credits are attempted before the flag is written. A credit that
    /// failed is forfeited once the flag is set.
    pub async fn apply_referral_credits(&self, referee_id: AccountId, report: &mut ReconcileReport) {
        let event = match self.ledger.find_uncredited_validated(&referee_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                report.record(
                    Step::LoadReferral,
                    StepOutcome::skipped("no validated referral awaiting credit"),
                );
                return;
            }
            Err(e) => {
                report.record(Step::LoadReferral, StepOutcome::Failed(e.into()));
                return;
            }
        };

        if !event.category.earns_event_credit() {
            report.record(
                Step::LoadReferral,
                StepOutcome::skipped(format!("{} referrals are credited in batch", event.category)),
            );
            return;
        }
        report.record(Step::LoadReferral, StepOutcome::Applied);

        let referrer_outcome = if event.referrer_reward_deferred {
            StepOutcome::skipped("reward accrued to referrer balance")
        } else {
            self.credit_party(&event, RewardRole::Referrer, event.referrer_id, &report.event_id)
                .await
        };
        report.record(Step::CreditReferrer, referrer_outcome);

        let referee_outcome = self
            .credit_party(&event, RewardRole::Referee, event.referee_id, &report.event_id)
            .await;
        report.record(Step::CreditReferee, referee_outcome);

        let outcome = match self.ledger.mark_credited(&event.id).await {
            Ok(true) => {
                tracing::info!(
                    referral_event_id = %event.id,
                    referee_id = %referee_id,
                    "Referral marked credited"
                );
                StepOutcome::Applied
            }
            Ok(false) => StepOutcome::skipped("already credited by a concurrent delivery"),
            Err(e) => {
                tracing::error!(
                    referral_event_id = %event.id,
                    referee_id = %referee_id,
                    error = %e,
                    "Failed to mark referral credited; credits were already attempted"
                );
                StepOutcome::Failed(e.into())
            }
        };
        report.record(Step::MarkCredited, outcome);
    }

    /// Flushes the account's accrued reward balance as one gateway credit.
    ///
    /// The balance is claimed atomically before the gateway call. It is given
    /// back only when the gateway definitely rejected the credit. When the
    /// outcome is unknown the periods stay claimed, so a later checkout cannot
    /// flush them a second time.
    pub async fn apply_stored_referral_credits(
        &self,
        account_id: AccountId,
        report: &mut ReconcileReport,
    ) {
        let outcome = self.flush_stored_credits(account_id, &report.event_id).await;
        report.record(Step::FlushStoredCredits, outcome);
    }

    async fn flush_stored_credits(&self, account_id: AccountId, event_id: &str) -> StepOutcome {
        let account = match self.accounts.find(&account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return StepOutcome::skipped("account no longer exists"),
            Err(e) => return StepOutcome::Failed(e.into()),
        };

        let Some(customer_id) = account.billing_customer_id.clone() else {
            return StepOutcome::skipped("no billing identity");
        };
        if account.accrued_reward_periods == 0 {
            return StepOutcome::skipped("nothing accrued");
        }

        let periods = match self.accounts.take_accrued_rewards(&account_id).await {
            Ok(0) => return StepOutcome::skipped("balance claimed by a concurrent delivery"),
            Ok(periods) => periods,
            Err(e) => return StepOutcome::Failed(e.into()),
        };

        let amount = credit_amount(periods, self.reward_period_value);
        let idempotency_key = format!("stored-credits:{}:{}", account_id, event_id);
        let request = BalanceCreditRequest {
            customer_id,
            amount,
            description: format!("Referral rewards: {} free months", periods),
            idempotency_key: idempotency_key.clone(),
        };

        match self.gateway.create_balance_credit(request).await {
            Ok(transaction) => {
                tracing::info!(
                    account_id = %account_id,
                    periods,
                    amount,
                    transaction_id = %transaction.id,
                    "Stored referral credits flushed"
                );
                StepOutcome::Applied
            }
            Err(e) if e.outcome_unknown() => {
                tracing::error!(
                    account_id = %account_id,
                    periods,
                    amount,
                    idempotency_key = %idempotency_key,
                    error = %e,
                    "Stored credit outcome unknown; periods stay claimed and need manual review"
                );
                StepOutcome::Failed(e.into())
            }
            Err(e) => {
                if let Err(restore_err) = self
                    .accounts
                    .restore_accrued_rewards(&account_id, periods)
                    .await
                {
                    tracing::error!(
                        account_id = %account_id,
                        periods,
                        error = %restore_err,
                        "Failed to restore accrued reward periods after gateway failure"
                    );
                }
                StepOutcome::Failed(e.into())
            }
        }
    }

    async fn credit_party(
        &self,
        event: &ReferralEvent,
        role: RewardRole,
        account_id: AccountId,
        event_id: &str,
    ) -> StepOutcome {
        let account = match self.accounts.find(&account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return StepOutcome::skipped(format!("{} account not found", role)),
            Err(e) => return StepOutcome::Failed(e.into()),
        };
        let Some(customer_id) = account.billing_customer_id else {
            return StepOutcome::skipped(format!("{} has no billing identity", role));
        };

        let amount = credit_amount(role.periods(), self.reward_period_value);
        let request = BalanceCreditRequest {
            customer_id,
            amount,
            description: role.description(),
            idempotency_key: role.idempotency_key(&event.id),
        };

        match self.gateway.create_balance_credit(request).await {
            Ok(transaction) => {
                tracing::info!(
                    referral_event_id = %event.id,
                    role = %role,
                    account_id = %account_id,
                    amount,
                    transaction_id = %transaction.id,
                    "Referral credit issued"
                );
                StepOutcome::Applied
            }
            Err(e) => {
                tracing::error!(
                    referral_event_id = %event.id,
                    event_id,
                    role = %role,
                    account_id = %account_id,
                    amount,
                    error = %e,
                    "Referral credit failed and will be forfeited"
                );
                StepOutcome::Failed(ReconcileError::from(e))
            }
        }
    }
}
