//! HTTP adapter for the gateway webhook.
//!
//! - `POST /webhooks/stripe` - verify and reconcile a gateway delivery
//! - `GET /health` - liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAck};
pub use handlers::{handle_stripe_webhook, health, WebhookAppState, SIGNATURE_HEADER};
pub use routes::{app, webhook_router};
