//! ReconciliationEngine - verifies a delivery and routes it by event kind.
//!
//! Dispatch offers no deduplication. Each branch is idempotent on its own,
//! and unknown kinds are acknowledged so new gateway event types never cause
//! redelivery.

use std::sync::Arc;

use secrecy::SecretString;

use crate::domain::foundation::AccountId;
use crate::domain::subscription::PriceCatalog;
use crate::domain::webhook::{
    CheckoutSessionObject, EventKind, GatewayEvent, InvoiceObject, SubscriptionObject,
    WebhookVerifier,
};
use crate::ports::{AccountStore, PaymentGateway, ReferralLedger, SubscriptionStore};

use super::apply_referral_credits::CreditApplicator;
use super::reconcile_error::ReconcileError;
use super::resolve_account::{AccountResolution, AccountResolver};
use super::step_report::{Disposition, ReconcileReport, Step, StepOutcome};
use super::sync_subscription::SubscriptionSynchronizer;
use super::validate_referral::ReferralValidator;

/// Placeholder id and kind for envelopes that could not be decoded.
const UNKNOWN_EVENT_ID: &str = "unknown";

/// Settings the engine is constructed with once at process start.
#[derive(Clone)]
pub struct EngineSettings {
    pub webhook_secret: SecretString,
    /// Drop test-mode events.
    pub require_livemode: bool,
    /// Value of one reward period in the smallest currency unit.
    pub reward_period_value: i64,
    pub catalog: PriceCatalog,
}

pub struct ReconciliationEngine {
    verifier: WebhookVerifier,
    require_livemode: bool,
    resolver: AccountResolver,
    synchronizer: SubscriptionSynchronizer,
    validator: ReferralValidator,
    credits: CreditApplicator,
}

impl ReconciliationEngine {
    pub fn new(
        settings: EngineSettings,
        gateway: Arc<dyn PaymentGateway>,
        accounts: Arc<dyn AccountStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        referrals: Arc<dyn ReferralLedger>,
    ) -> Self {
        Self {
            verifier: WebhookVerifier::new(settings.webhook_secret),
            require_livemode: settings.require_livemode,
            resolver: AccountResolver::new(accounts.clone()),
            synchronizer: SubscriptionSynchronizer::new(
                accounts.clone(),
                subscriptions,
                gateway.clone(),
                settings.catalog,
            ),
            validator: ReferralValidator::new(referrals.clone()),
            credits: CreditApplicator::new(
                accounts,
                referrals,
                gateway,
                settings.reward_period_value,
            ),
        }
    }

    /// Verifies a raw delivery and reconciles it.
    ///
    /// # Errors
    ///
    /// Only `ReconcileError::Authentication`. Every downstream failure,
    /// including an authenticated body that is not a usable envelope, is
    /// recorded in the returned report instead.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        self.verifier.verify(payload, signature).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            ReconcileError::Authentication(e)
        })?;

        match GatewayEvent::from_slice(payload) {
            Ok(event) => Ok(self.process(&event).await),
            Err(e) => Ok(undecodable(e)),
        }
    }

    /// Reconciles an already verified event.
    pub async fn process(&self, event: &GatewayEvent) -> ReconcileReport {
        let mut report = ReconcileReport::new(&event.id, event.kind.clone());
        tracing::info!(event_id = %event.id, kind = %event.kind, "Processing webhook event");

        if self.require_livemode && !event.livemode {
            report.drop_event("test mode event");
        } else {
            match &event.kind {
                EventKind::CheckoutSessionCompleted => {
                    self.on_checkout_completed(event, &mut report).await
                }
                EventKind::SubscriptionUpdated => {
                    self.on_subscription_updated(event, &mut report).await
                }
                EventKind::SubscriptionDeleted => {
                    self.on_subscription_deleted(event, &mut report).await
                }
                EventKind::InvoicePaymentFailed => {
                    self.on_invoice_payment_failed(event, &mut report).await
                }
                _ => report.disposition = Disposition::Unhandled,
            }
        }

        report.log();
        report
    }

    async fn on_checkout_completed(&self, event: &GatewayEvent, report: &mut ReconcileReport) {
        let Some(session) = decode::<CheckoutSessionObject>(event, report) else {
            return;
        };
        let Some(account_id) = self
            .resolve(session.account_hint(), session.customer.as_deref(), report)
            .await
        else {
            return;
        };

        self.synchronizer
            .on_checkout_completed(account_id, &session, report)
            .await;
        self.credits
            .apply_stored_referral_credits(account_id, report)
            .await;
    }

    async fn on_subscription_updated(&self, event: &GatewayEvent, report: &mut ReconcileReport) {
        let Some(subscription) = decode::<SubscriptionObject>(event, report) else {
            return;
        };
        let Some(account_id) = self
            .resolve(
                subscription.account_hint(),
                subscription.customer.as_deref(),
                report,
            )
            .await
        else {
            return;
        };

        let status = self
            .synchronizer
            .on_subscription_updated(account_id, &subscription, report)
            .await;

        // Trials are not a paying conversion.
        if status.is_some_and(|s| s.is_paying())
            && self.validator.validate(account_id, report).await
        {
            self.credits.apply_referral_credits(account_id, report).await;
        }
    }

    async fn on_subscription_deleted(&self, event: &GatewayEvent, report: &mut ReconcileReport) {
        let Some(subscription) = decode::<SubscriptionObject>(event, report) else {
            return;
        };
        let Some(account_id) = self
            .resolve(
                subscription.account_hint(),
                subscription.customer.as_deref(),
                report,
            )
            .await
        else {
            return;
        };

        self.synchronizer
            .on_subscription_deleted(account_id, &subscription, report)
            .await;
    }

    async fn on_invoice_payment_failed(&self, event: &GatewayEvent, report: &mut ReconcileReport) {
        let Some(invoice) = decode::<InvoiceObject>(event, report) else {
            return;
        };
        let Some(account_id) = self
            .resolve(None, invoice.customer.as_deref(), report)
            .await
        else {
            return;
        };

        self.synchronizer
            .on_invoice_payment_failed(account_id, report)
            .await;
    }

    /// Resolves the account or drops the event.
    async fn resolve(
        &self,
        hint: Option<&str>,
        customer_id: Option<&str>,
        report: &mut ReconcileReport,
    ) -> Option<AccountId> {
        match self.resolver.resolve(hint, customer_id).await {
            Ok(AccountResolution::NotFound) => {
                let reference = customer_id.or(hint).unwrap_or("<none>").to_string();
                tracing::warn!(
                    event_id = %report.event_id,
                    reference = %reference,
                    "No account matches webhook event"
                );
                report.record(
                    Step::ResolveAccount,
                    StepOutcome::Failed(ReconcileError::UnresolvedAccount(reference)),
                );
                report.drop_event("no matching account");
                None
            }
            Ok(resolution) => {
                report.record(Step::ResolveAccount, StepOutcome::Applied);
                resolution.account_id()
            }
            Err(e) => {
                report.record(Step::ResolveAccount, StepOutcome::Failed(e));
                report.drop_event("account lookup failed");
                None
            }
        }
    }
}

/// Report for an authenticated body that is not an event envelope.
fn undecodable(error: serde_json::Error) -> ReconcileReport {
    let kind = EventKind::Other(UNKNOWN_EVENT_ID.to_string());
    let mut report = ReconcileReport::new(UNKNOWN_EVENT_ID, kind);
    report.record(
        Step::DecodeObject,
        StepOutcome::Failed(ReconcileError::MalformedEvent(error.to_string())),
    );
    report.drop_event("malformed event envelope");
    report.log();
    report
}

/// Decodes the event object or drops the event.
fn decode<T: serde::de::DeserializeOwned>(
    event: &GatewayEvent,
    report: &mut ReconcileReport,
) -> Option<T> {
    match event.object::<T>() {
        Ok(object) => Some(object),
        Err(e) => {
            report.record(
                Step::DecodeObject,
                StepOutcome::Failed(ReconcileError::MalformedEvent(e.to_string())),
            );
            report.drop_event("malformed event object");
            None
        }
    }
}
