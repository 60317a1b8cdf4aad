//! Axum router configuration for the webhook endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{handle_stripe_webhook, health, WebhookAppState};

/// Routes for gateway deliveries.
///
/// - `POST /webhooks/stripe` - signed gateway event
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

/// The full service: webhook routes, health probe and request tracing.
pub fn app(state: WebhookAppState) -> Router {
    Router::new()
        .merge(webhook_router())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
