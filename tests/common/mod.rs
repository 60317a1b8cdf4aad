//! Shared harness: the full engine wired to the in-memory store and the
//! mock gateway, plus builders for signed gateway deliveries.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};

use billing_reconciler::adapters::memory::InMemoryStore;
use billing_reconciler::adapters::stripe::MockPaymentGateway;
use billing_reconciler::application::handlers::reconciliation::{
    EngineSettings, ReconcileReport, ReconciliationEngine,
};
use billing_reconciler::domain::account::UserAccount;
use billing_reconciler::domain::foundation::AccountId;
use billing_reconciler::domain::subscription::PriceCatalog;
use billing_reconciler::domain::webhook::sign_payload;
use billing_reconciler::ports::GatewaySubscription;

pub const SECRET: &str = "whsec_integration";
pub const PERIOD_VALUE: i64 = 1000;
pub const MONTHLY_PRICE: &str = "price_monthly";
pub const ANNUAL_PRICE: &str = "price_annual";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub engine: Arc<ReconciliationEngine>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let settings = EngineSettings {
            webhook_secret: SecretString::new(SECRET.to_string()),
            require_livemode: false,
            reward_period_value: PERIOD_VALUE,
            catalog: PriceCatalog {
                standard_monthly_price_id: MONTHLY_PRICE.to_string(),
                standard_annual_price_id: ANNUAL_PRICE.to_string(),
                early_monthly_price_id: None,
                early_annual_price_id: None,
                early_subscriber_threshold: 0,
            },
        };
        let engine = Arc::new(ReconciliationEngine::new(
            settings,
            gateway.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        Self {
            store,
            gateway,
            engine,
        }
    }

    /// New account with no billing identity.
    pub fn account(&self, email: &str) -> AccountId {
        let id = AccountId::new();
        self.store.insert_account(UserAccount::new(id, email));
        id
    }

    /// New account that already has a billing identity.
    pub fn billed_account(&self, email: &str, customer_id: &str) -> AccountId {
        let id = AccountId::new();
        self.store
            .insert_account(UserAccount::new(id, email).with_billing_customer(customer_id));
        id
    }

    /// Gateway-side subscription later re-fetched by checkout completion.
    pub fn gateway_subscription(&self, id: &str, customer: &str, status: &str, price: &str) {
        self.gateway.insert_subscription(GatewaySubscription {
            id: id.to_string(),
            customer_id: customer.to_string(),
            status: status.to_string(),
            price_id: Some(price.to_string()),
            current_period_end: Some(1767225600),
            metadata: Default::default(),
        });
    }

    /// Signs and delivers a body exactly as the gateway would.
    pub async fn deliver(&self, body: &Value) -> ReconcileReport {
        let payload = serde_json::to_vec(body).expect("serializable event");
        let signature = signature_for(&payload);
        self.engine
            .handle(&payload, &signature)
            .await
            .expect("signed delivery is accepted")
    }
}

pub fn signature_for(payload: &[u8]) -> String {
    sign_payload(SECRET, chrono::Utc::now().timestamp(), payload)
}

pub fn envelope(event_id: &str, kind: &str, object: Value) -> Value {
    json!({
        "id": event_id,
        "object": "event",
        "type": kind,
        "created": 1704067200,
        "livemode": false,
        "data": { "object": object }
    })
}

pub fn checkout_completed(
    event_id: &str,
    account: AccountId,
    customer: &str,
    subscription: &str,
) -> Value {
    envelope(
        event_id,
        "checkout.session.completed",
        json!({
            "id": format!("cs_{}", event_id),
            "object": "checkout.session",
            "customer": customer,
            "subscription": subscription,
            "client_reference_id": account.to_string(),
            "metadata": { "account_id": account.to_string() }
        }),
    )
}

pub fn subscription_object(subscription: &str, customer: &str, status: &str, price: &str) -> Value {
    json!({
        "id": subscription,
        "object": "subscription",
        "customer": customer,
        "status": status,
        "current_period_end": 1767225600,
        "items": { "data": [ { "price": { "id": price } } ] }
    })
}

pub fn subscription_updated(
    event_id: &str,
    subscription: &str,
    customer: &str,
    status: &str,
) -> Value {
    envelope(
        event_id,
        "customer.subscription.updated",
        subscription_object(subscription, customer, status, MONTHLY_PRICE),
    )
}

pub fn subscription_deleted(event_id: &str, subscription: &str, customer: &str) -> Value {
    envelope(
        event_id,
        "customer.subscription.deleted",
        subscription_object(subscription, customer, "canceled", MONTHLY_PRICE),
    )
}

pub fn invoice_payment_failed(event_id: &str, subscription: &str, customer: &str) -> Value {
    envelope(
        event_id,
        "invoice.payment_failed",
        json!({
            "id": format!("in_{}", event_id),
            "object": "invoice",
            "customer": customer,
            "subscription": subscription
        }),
    )
}
