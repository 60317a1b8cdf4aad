//! Webhook module - authenticating and decoding gateway events.

mod envelope;
mod errors;
mod objects;
mod verifier;

pub use envelope::{EventData, EventKind, GatewayEvent};
pub use errors::WebhookError;
pub use objects::{
    CheckoutSessionObject, InvoiceObject, PriceObject, SubscriptionItem, SubscriptionItems,
    SubscriptionObject, ACCOUNT_ID_METADATA_KEY,
};
pub use verifier::{sign_payload, SignatureHeader, WebhookVerifier};
