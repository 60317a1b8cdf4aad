//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine to external systems:
//! - `http` - Axum webhook endpoint
//! - `memory` - In-process stores for tests and local runs
//! - `postgres` - PostgreSQL-backed stores
//! - `stripe` - Stripe payment gateway client and mock

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::InMemoryStore;
pub use postgres::{PostgresAccountStore, PostgresReferralLedger, PostgresSubscriptionStore};
pub use stripe::{MockPaymentGateway, StripeConfig, StripeGateway};
