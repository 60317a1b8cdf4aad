//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresAccountStore` - billing identity, entitlement, accrued rewards
//! - `PostgresSubscriptionStore` - one subscription row per account
//! - `PostgresReferralLedger` - referral validation and the credited flag

mod account_store;
mod referral_ledger;
mod subscription_store;

pub use account_store::PostgresAccountStore;
pub use referral_ledger::PostgresReferralLedger;
pub use subscription_store::PostgresSubscriptionStore;
