//! Subscription State Synchronizer.
//!
//! Maps gateway subscription state onto the subscription row and the
//! account's entitlement flag. Every write replaces the stored value, so
//! replays converge on the same state.

use std::sync::Arc;

use crate::domain::foundation::{AccountId, Timestamp};
use crate::domain::subscription::{PriceCatalog, SubscriptionRecord, SubscriptionStatus};
use crate::domain::webhook::{CheckoutSessionObject, SubscriptionObject};
use crate::ports::{AccountStore, GatewaySubscription, PaymentGateway, SubscriptionStore};

use super::reconcile_error::ReconcileError;
use super::step_report::{ReconcileReport, Step, StepOutcome};

pub struct SubscriptionSynchronizer {
    accounts: Arc<dyn AccountStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: PriceCatalog,
}

impl SubscriptionSynchronizer {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: PriceCatalog,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
            gateway,
            catalog,
        }
    }

    /// Checkout completion.
    ///
    /// The embedded session lacks most subscription fields, so the
    /// subscription is re-fetched from the gateway before the upsert.
    /// Entitlement is granted unconditionally.
    pub async fn on_checkout_completed(
        &self,
        account_id: AccountId,
        session: &CheckoutSessionObject,
        report: &mut ReconcileReport,
    ) {
        let outcome = match session.customer.as_deref() {
            Some(customer_id) => self.attach_billing_identity(account_id, customer_id).await,
            None => StepOutcome::skipped("session has no customer"),
        };
        report.record(Step::AttachBillingIdentity, outcome);

        let fetched = match session.subscription.as_deref() {
            Some(subscription_id) => match self.gateway.get_subscription(subscription_id).await {
                Ok(Some(subscription)) => {
                    report.record(Step::FetchSubscription, StepOutcome::Applied);
                    Some(subscription)
                }
                Ok(None) => {
                    report.record(
                        Step::FetchSubscription,
                        StepOutcome::skipped(format!(
                            "gateway does not know subscription {}",
                            subscription_id
                        )),
                    );
                    None
                }
                Err(e) => {
                    report.record(Step::FetchSubscription, StepOutcome::Failed(e.into()));
                    None
                }
            },
            None => {
                report.record(
                    Step::FetchSubscription,
                    StepOutcome::skipped("session has no subscription"),
                );
                None
            }
        };

        if let Some(subscription) = fetched {
            let outcome = match self.record_from_gateway(account_id, &subscription) {
                Ok(record) => self.store(&record).await,
                Err(e) => StepOutcome::Failed(e),
            };
            report.record(Step::UpsertSubscription, outcome);
        }

        let outcome = self.write_entitlement(account_id, true).await;
        report.record(Step::SetEntitlement, outcome);
    }

    /// Subscription update. Returns the new status when it was recognised.
    pub async fn on_subscription_updated(
        &self,
        account_id: AccountId,
        subscription: &SubscriptionObject,
        report: &mut ReconcileReport,
    ) -> Option<SubscriptionStatus> {
        let Some(status) = SubscriptionStatus::from_gateway(&subscription.status) else {
            report.record(
                Step::UpsertSubscription,
                StepOutcome::Failed(ReconcileError::MalformedEvent(format!(
                    "unrecognised subscription status {}",
                    subscription.status
                ))),
            );
            return None;
        };

        let record = self.record_from_object(account_id, subscription, status);
        let outcome = self.store(&record).await;
        report.record(Step::UpsertSubscription, outcome);

        let outcome = self.write_entitlement(account_id, status.grants_entitlement()).await;
        report.record(Step::SetEntitlement, outcome);

        Some(status)
    }

    /// Subscription deletion. Forces cancelled and revokes entitlement.
    pub async fn on_subscription_deleted(
        &self,
        account_id: AccountId,
        subscription: &SubscriptionObject,
        report: &mut ReconcileReport,
    ) {
        let record =
            self.record_from_object(account_id, subscription, SubscriptionStatus::Cancelled);
        let outcome = self.store(&record).await;
        report.record(Step::UpsertSubscription, outcome);

        let outcome = self.write_entitlement(account_id, false).await;
        report.record(Step::SetEntitlement, outcome);
    }

    /// Failed invoice payment. Marks past due and leaves entitlement alone;
    /// the gateway's own follow-up subscription event settles access.
    pub async fn on_invoice_payment_failed(
        &self,
        account_id: AccountId,
        report: &mut ReconcileReport,
    ) {
        let outcome = match self
            .subscriptions
            .set_status(&account_id, SubscriptionStatus::PastDue)
            .await
        {
            Ok(Some(record)) => {
                tracing::info!(
                    account_id = %account_id,
                    subscription_id = %record.external_subscription_id,
                    plan = %record.plan,
                    status = %record.status,
                    "Subscription marked past due"
                );
                StepOutcome::Applied
            }
            Ok(None) => StepOutcome::skipped("no subscription recorded for account"),
            Err(e) => StepOutcome::Failed(e.into()),
        };
        report.record(Step::UpdateStatus, outcome);
    }

    fn record_from_gateway(
        &self,
        account_id: AccountId,
        subscription: &GatewaySubscription,
    ) -> Result<SubscriptionRecord, ReconcileError> {
        let status = SubscriptionStatus::from_gateway(&subscription.status).ok_or_else(|| {
            ReconcileError::MalformedEvent(format!(
                "unrecognised subscription status {}",
                subscription.status
            ))
        })?;

        Ok(SubscriptionRecord {
            account_id,
            external_subscription_id: subscription.id.clone(),
            billing_customer_id: Some(subscription.customer_id.clone()),
            plan: self.catalog.plan_for_price(subscription.price_id.as_deref()),
            status,
            current_period_end: subscription.current_period_end.and_then(Timestamp::from_unix),
        })
    }

    fn record_from_object(
        &self,
        account_id: AccountId,
        subscription: &SubscriptionObject,
        status: SubscriptionStatus,
    ) -> SubscriptionRecord {
        SubscriptionRecord {
            account_id,
            external_subscription_id: subscription.id.clone(),
            billing_customer_id: subscription.customer.clone(),
            plan: self.catalog.plan_for_price(subscription.price_id()),
            status,
            current_period_end: subscription.period_end().and_then(Timestamp::from_unix),
        }
    }

    async fn store(&self, record: &SubscriptionRecord) -> StepOutcome {
        match self.subscriptions.upsert(record).await {
            Ok(()) => {
                tracing::info!(
                    account_id = %record.account_id,
                    subscription_id = %record.external_subscription_id,
                    status = %record.status,
                    plan = %record.plan,
                    "Subscription synchronized"
                );
                StepOutcome::Applied
            }
            Err(e) => StepOutcome::Failed(e.into()),
        }
    }

    async fn write_entitlement(&self, account_id: AccountId, entitled: bool) -> StepOutcome {
        match self.accounts.set_entitlement(&account_id, entitled).await {
            Ok(()) => {
                tracing::info!(account_id = %account_id, entitled, "Entitlement updated");
                StepOutcome::Applied
            }
            Err(e) => StepOutcome::Failed(e.into()),
        }
    }

    async fn attach_billing_identity(&self, account_id: AccountId, customer_id: &str) -> StepOutcome {
        match self
            .accounts
            .attach_billing_customer(&account_id, customer_id)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    account_id = %account_id,
                    customer_id,
                    "Billing identity recorded"
                );
                StepOutcome::Applied
            }
            Ok(false) => StepOutcome::skipped("billing identity already recorded"),
            Err(e) => StepOutcome::Failed(e.into()),
        }
    }
}
