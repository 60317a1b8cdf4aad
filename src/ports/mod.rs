//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the engine and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - subscription reads and balance credits
//! - `AccountStore` - billing identity, entitlement flag, accrued rewards
//! - `SubscriptionStore` - one subscription row per account
//! - `ReferralLedger` - referral validation and the credited flag

mod account_store;
mod payment_gateway;
mod referral_ledger;
mod subscription_store;

pub use account_store::AccountStore;
pub use payment_gateway::{
    BalanceCreditRequest, BalanceTransaction, GatewayError, GatewayErrorCode, GatewaySubscription,
    PaymentGateway,
};
pub use referral_ledger::ReferralLedger;
pub use subscription_store::SubscriptionStore;
