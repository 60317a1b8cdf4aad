//! HTTP adapters - the inbound webhook surface.

pub mod webhook;

pub use webhook::{app, webhook_router, WebhookAppState};
