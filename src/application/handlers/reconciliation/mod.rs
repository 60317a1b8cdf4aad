//! Reconciliation handlers.
//!
//! Turn verified gateway events into subscription, entitlement and
//! referral-ledger writes:
//!
//! - `ReconciliationEngine` - verification and dispatch by event kind
//! - `AccountResolver` - metadata first, billing identity second
//! - `SubscriptionSynchronizer` - subscription row and entitlement flag
//! - `ReferralValidator` - pending to validated
//! - `CreditApplicator` - per-event credits and stored-credit flushes

mod apply_referral_credits;
mod dispatch_webhook;
mod reconcile_error;
mod resolve_account;
mod step_report;
mod sync_subscription;
mod validate_referral;

pub use apply_referral_credits::CreditApplicator;
pub use dispatch_webhook::{EngineSettings, ReconciliationEngine};
pub use reconcile_error::ReconcileError;
pub use resolve_account::{AccountResolution, AccountResolver};
pub use step_report::{Disposition, ReconcileReport, Step, StepOutcome, StepRecord};
pub use sync_subscription::SubscriptionSynchronizer;
pub use validate_referral::ReferralValidator;
