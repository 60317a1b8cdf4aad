//! ReferralLedger port - referral validation and the credited flag.
//!
//! Both transitions are guarded writes: `validate_pending` matches only
//! pending rows and `mark_credited` only uncredited ones. Two concurrent
//! callers can never both observe success.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError, ReferralEventId};
use crate::domain::referral::{ReferralEvent, ReferralValidation};

#[async_trait]
pub trait ReferralLedger: Send + Sync {
    /// Flip the referee's pending referral to validated, in one atomic operation.
    ///
    /// For entrepreneur referrals whose referrer has no billing identity the
    /// same operation adds `referrer_accrual_periods` to the referrer's
    /// accrued balance and records the deferral on the event.
    ///
    /// Returns `None` if there was no pending referral for this referee.
    async fn validate_pending(
        &self,
        referee_id: &AccountId,
        referrer_accrual_periods: u32,
    ) -> Result<Option<ReferralValidation>, DomainError>;

    /// The referee's referral with status validated and credited false.
    async fn find_uncredited_validated(
        &self,
        referee_id: &AccountId,
    ) -> Result<Option<ReferralEvent>, DomainError>;

    /// Set credited on a validated, uncredited referral.
    ///
    /// Returns `false` if it was already credited.
    async fn mark_credited(&self, id: &ReferralEventId) -> Result<bool, DomainError>;
}
