//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-configured subscriptions
//! - Error injection
//! - Call tracking
//! - Idempotency-key deduplication of credits, matching the real gateway

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{
    BalanceCreditRequest, BalanceTransaction, GatewayError, GatewaySubscription, PaymentGateway,
};

/// Mock gateway for tests.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.insert_subscription(subscription);
/// gateway.fail_next_credit(GatewayError::network("reset"));
/// assert_eq!(gateway.credits().len(), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, GatewaySubscription>,

    /// Applied credits keyed by idempotency key, in application order.
    credits: Vec<(String, BalanceCreditRequest)>,

    /// Every `create_balance_credit` call, including deduplicated ones.
    credit_attempts: usize,

    next_fetch_error: Option<GatewayError>,
    next_credit_error: Option<GatewayError>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn insert_subscription(&self, subscription: GatewaySubscription) {
        let id = subscription.id.clone();
        self.inner.lock().unwrap().subscriptions.insert(id, subscription);
    }

    /// Make the next `get_subscription` call fail.
    pub fn fail_next_fetch(&self, error: GatewayError) {
        self.inner.lock().unwrap().next_fetch_error = Some(error);
    }

    /// Make the next `create_balance_credit` call fail.
    pub fn fail_next_credit(&self, error: GatewayError) {
        self.inner.lock().unwrap().next_credit_error = Some(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Credits actually applied, one per distinct idempotency key.
    pub fn credits(&self) -> Vec<BalanceCreditRequest> {
        self.inner
            .lock()
            .unwrap()
            .credits
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn credit_attempts(&self) -> usize {
        self.inner.lock().unwrap().credit_attempts
    }

    /// Sum of credited amounts for a customer.
    pub fn total_credited(&self, customer_id: &str) -> i64 {
        self.credits()
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .map(|c| c.amount)
            .sum()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(err) = state.next_fetch_error.take() {
            return Err(err);
        }
        Ok(state.subscriptions.get(subscription_id).cloned())
    }

    async fn create_balance_credit(
        &self,
        request: BalanceCreditRequest,
    ) -> Result<BalanceTransaction, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.credit_attempts += 1;
        if let Some(err) = state.next_credit_error.take() {
            return Err(err);
        }

        let transaction = BalanceTransaction {
            id: format!("cbtxn_{}", request.idempotency_key),
            customer_id: request.customer_id.clone(),
            amount: -request.amount,
        };

        let seen = state
            .credits
            .iter()
            .any(|(key, _)| key == &request.idempotency_key);
        if !seen {
            state
                .credits
                .push((request.idempotency_key.clone(), request));
        }

        Ok(transaction)
    }
}
