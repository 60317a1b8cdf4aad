//! Failure taxonomy for event reconciliation.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::domain::webhook::WebhookError;
use crate::ports::GatewayError;

/// Errors raised while reconciling one gateway event.
///
/// Only `Authentication` ever reaches the HTTP caller. Everything else is
/// recorded against the step that produced it and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Signature or envelope verification failed. Nothing was processed.
    #[error("Authentication failed: {0}")]
    Authentication(#[from] WebhookError),

    /// No internal account matches the event.
    #[error("No account matches {0}")]
    UnresolvedAccount(String),

    /// A gateway read or write failed.
    #[error("Gateway call failed: {0}")]
    UpstreamGateway(#[from] GatewayError),

    /// A store read or write failed.
    #[error("Store operation failed: {0}")]
    Persistence(#[from] DomainError),

    /// The authenticated event object is missing fields the step needs.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}

impl ReconcileError {
    /// True for failures the caller should be told about.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ReconcileError::Authentication(_))
    }
}
