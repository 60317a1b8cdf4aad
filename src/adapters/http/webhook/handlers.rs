//! Axum handlers for the webhook endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::application::handlers::reconciliation::{ReconcileError, ReconciliationEngine};
use crate::domain::webhook::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAck};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookAppState {
    pub engine: Arc<ReconciliationEngine>,
}

impl WebhookAppState {
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self { engine }
    }
}

/// POST /webhooks/stripe - Verify and reconcile a gateway delivery.
///
/// Any authenticated delivery is acknowledged with 200, including ones whose
/// processing recorded failures; the gateway would otherwise redeliver events
/// the engine has already partially applied.
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignatureHeader)?
        .to_string();

    // Processing runs on its own task so a dropped connection cannot cancel
    // it between gateway credits and the ledger write.
    let engine = state.engine.clone();
    let task = tokio::spawn(async move { engine.handle(&body, &signature).await });

    match task.await {
        Ok(Ok(_report)) => {}
        Ok(Err(e)) => return Err(WebhookApiError(e)),
        Err(join_error) => {
            tracing::error!(error = %join_error, "Webhook processing task failed");
        }
    }

    Ok((StatusCode::OK, Json(WebhookAck::received())))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts reconciliation errors to HTTP responses.
pub struct WebhookApiError(ReconcileError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(ReconcileError::Authentication(err))
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            ReconcileError::Authentication(e) => (e.status_code(), e.code()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let error = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(error)).into_response()
    }
}
