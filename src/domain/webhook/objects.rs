//! Gateway objects carried in event payloads.

use serde::Deserialize;
use std::collections::HashMap;

/// Metadata key carrying the internal account id.
pub const ACCOUNT_ID_METADATA_KEY: &str = "account_id";

/// Checkout session object (checkout.session.completed).
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Account id hint: metadata first, then the client reference id.
    pub fn account_hint(&self) -> Option<&str> {
        self.metadata
            .get(ACCOUNT_ID_METADATA_KEY)
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
    }
}

/// Subscription object (customer.subscription.*).
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<PriceObject>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceObject {
    pub id: String,
}

impl SubscriptionObject {
    pub fn account_hint(&self) -> Option<&str> {
        self.metadata.get(ACCOUNT_ID_METADATA_KEY).map(String::as_str)
    }

    /// Price of the first subscription item.
    pub fn price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }

    /// Period end, falling back to the first item for newer API versions.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

/// Invoice object (invoice.*). Invoices carry no account metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}
