//! Command handlers for the application layer.

pub mod reconciliation;

pub use reconciliation::{
    AccountResolution, AccountResolver, CreditApplicator, Disposition, EngineSettings,
    ReconcileError, ReconcileReport, ReconciliationEngine, ReferralValidator, Step, StepOutcome,
    StepRecord, SubscriptionSynchronizer,
};
