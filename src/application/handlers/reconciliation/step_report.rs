//! Per-step outcome reporting.
//!
//! Handlers continue past non-fatal failures. Each step's result is recorded
//! here so the outcome of a delivery can be inspected and logged as a whole.

use std::fmt;

use crate::domain::webhook::EventKind;

use super::reconcile_error::ReconcileError;

/// Named units of work within one event's handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    DecodeObject,
    ResolveAccount,
    AttachBillingIdentity,
    FetchSubscription,
    UpsertSubscription,
    UpdateStatus,
    SetEntitlement,
    ValidateReferral,
    LoadReferral,
    CreditReferrer,
    CreditReferee,
    MarkCredited,
    FlushStoredCredits,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::DecodeObject => "decode_object",
            Step::ResolveAccount => "resolve_account",
            Step::AttachBillingIdentity => "attach_billing_identity",
            Step::FetchSubscription => "fetch_subscription",
            Step::UpsertSubscription => "upsert_subscription",
            Step::UpdateStatus => "update_status",
            Step::SetEntitlement => "set_entitlement",
            Step::ValidateReferral => "validate_referral",
            Step::LoadReferral => "load_referral",
            Step::CreditReferrer => "credit_referrer",
            Step::CreditReferee => "credit_referee",
            Step::MarkCredited => "mark_credited",
            Step::FlushStoredCredits => "flush_stored_credits",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(String),
    Failed(ReconcileError),
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped(reason.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// What happened to the event as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Routed to a handler. Individual steps may still have failed.
    Processed,
    /// Kind not handled by this engine. Acknowledged as success.
    Unhandled,
    /// Not actionable, e.g. no matching account. Acknowledged as success.
    Dropped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Outcome of reconciling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub event_id: String,
    pub kind: EventKind,
    pub disposition: Disposition,
    pub steps: Vec<StepRecord>,
}

impl ReconcileReport {
    pub fn new(event_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            disposition: Disposition::Processed,
            steps: Vec::new(),
        }
    }

    /// Appends a step result. Failures are logged as they are recorded.
    pub fn record(&mut self, step: Step, outcome: StepOutcome) {
        if let StepOutcome::Failed(err) = &outcome {
            tracing::warn!(
                event_id = %self.event_id,
                kind = %self.kind,
                step = %step,
                error = %err,
                "Reconciliation step failed"
            );
        }
        self.steps.push(StepRecord { step, outcome });
    }

    /// Marks the event as not actionable.
    pub fn drop_event(&mut self, reason: impl Into<String>) {
        self.disposition = Disposition::Dropped(reason.into());
    }

    /// Latest outcome recorded for `step`.
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .rev()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|record| record.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Emits one summary line for the delivery.
    pub fn log(&self) {
        let applied = self.steps.iter().filter(|r| r.outcome.is_applied()).count();
        let failed = self.failures().count();

        match &self.disposition {
            Disposition::Processed => tracing::info!(
                event_id = %self.event_id,
                kind = %self.kind,
                applied,
                failed,
                "Webhook event reconciled"
            ),
            Disposition::Unhandled => tracing::info!(
                event_id = %self.event_id,
                kind = %self.kind,
                "Webhook event kind not handled, acknowledging"
            ),
            Disposition::Dropped(reason) => tracing::warn!(
                event_id = %self.event_id,
                kind = %self.kind,
                reason = %reason,
                failed,
                "Webhook event dropped"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::DomainError;

    #[test]
    fn new_report_is_processed_and_empty() {
        let report = ReconcileReport::new("evt_1", EventKind::SubscriptionUpdated);
        assert_eq!(report.disposition, Disposition::Processed);
        assert!(report.steps.is_empty());
        assert!(!report.has_failures());
    }

    #[test]
    fn outcome_returns_latest_record_for_step() {
        let mut report = ReconcileReport::new("evt_1", EventKind::SubscriptionUpdated);
        report.record(Step::SetEntitlement, StepOutcome::skipped("first"));
        report.record(Step::SetEntitlement, StepOutcome::Applied);

        assert_eq!(report.outcome(Step::SetEntitlement), Some(&StepOutcome::Applied));
        assert_eq!(report.outcome(Step::MarkCredited), None);
    }

    #[test]
    fn failures_are_counted() {
        let mut report = ReconcileReport::new("evt_1", EventKind::CheckoutSessionCompleted);
        report.record(Step::UpsertSubscription, StepOutcome::Applied);
        report.record(
            Step::SetEntitlement,
            StepOutcome::Failed(DomainError::database("down").into()),
        );

        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn drop_event_sets_disposition() {
        let mut report = ReconcileReport::new("evt_1", EventKind::InvoicePaymentFailed);
        report.drop_event("no matching account");
        assert_eq!(
            report.disposition,
            Disposition::Dropped("no matching account".to_string())
        );
    }
}
