//! Payment gateway port.
//!
//! The engine only needs two things from the gateway: an authoritative read
//! of a subscription, and balance credits issued against a customer. Both
//! are provider agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Get subscription by provider ID.
    ///
    /// Returns `None` if the gateway does not know the subscription.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, GatewayError>;

    /// Issue a credit (a negative balance transaction) to a customer.
    ///
    /// Implementations must forward `idempotency_key` so that repeated calls
    /// with the same key apply the credit at most once.
    async fn create_balance_credit(
        &self,
        request: BalanceCreditRequest,
    ) -> Result<BalanceTransaction, GatewayError>;
}

/// Subscription as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub customer_id: String,
    /// Raw gateway status string.
    pub status: String,
    /// Price of the first subscription item.
    pub price_id: Option<String>,
    /// Unix timestamp.
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Request to credit a customer's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCreditRequest {
    pub customer_id: String,
    /// Positive amount in the smallest currency unit.
    pub amount: i64,
    pub description: String,
    pub idempotency_key: String,
}

/// Balance transaction recorded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTransaction {
    pub id: String,
    pub customer_id: String,
    /// Signed amount as recorded. Credits are negative.
    pub amount: i64,
}

/// Gateway call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    /// Whether the gateway may have applied the request despite the error.
    pub fn outcome_unknown(&self) -> bool {
        self.code.is_indeterminate()
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected as invalid.
    InvalidRequest,

    /// Provider API error.
    ProviderError,
}

impl GatewayErrorCode {
    /// The request may have been applied: it went out but no definitive
    /// rejection came back.
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::ProviderError
        )
    }

    /// Categorizes an HTTP status returned by the gateway.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => GatewayErrorCode::AuthenticationError,
            404 => GatewayErrorCode::NotFound,
            429 => GatewayErrorCode::RateLimitExceeded,
            400..=499 => GatewayErrorCode::InvalidRequest,
            _ => GatewayErrorCode::ProviderError,
        }
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
