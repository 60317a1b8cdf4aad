//! Errors raised while authenticating an inbound webhook.

use http::StatusCode;
use thiserror::Error;

/// Authentication failures. All of them reject the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The request carried no signature header.
    #[error("Missing signature header")]
    MissingSignatureHeader,

    /// The signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// No provided signature matched the expected HMAC.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is too old or too far in the future.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,
}

impl WebhookError {
    /// Every verification failure is a client error. Gateways do not retry 4xx.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignatureHeader => "MISSING_SIGNATURE",
            WebhookError::MalformedSignatureHeader(_) => "MALFORMED_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
        }
    }
}
