//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port over the Stripe REST API:
//! - Subscription reads
//! - Customer balance credits with idempotency keys
//!
//! The API key is handled via `secrecy::SecretString`.

mod mock_gateway;
mod stripe_gateway;

pub use mock_gateway::MockPaymentGateway;
pub use stripe_gateway::{StripeConfig, StripeGateway};
