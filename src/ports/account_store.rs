//! AccountStore port - the account fields this engine owns.
//!
//! Every write is a single conditional statement so concurrent deliveries
//! for the same account cannot lose updates.

use async_trait::async_trait;

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AccountId, DomainError};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by id.
    async fn find(&self, id: &AccountId) -> Result<Option<UserAccount>, DomainError>;

    /// Reverse lookup by external billing identity.
    async fn find_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError>;

    /// Record the billing identity if the account has none yet.
    ///
    /// Returns `true` if the identity was written, `false` if the account
    /// already had one or does not exist.
    async fn attach_billing_customer(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<bool, DomainError>;

    /// Overwrite the entitlement flag.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if no such account exists.
    async fn set_entitlement(&self, id: &AccountId, entitled: bool) -> Result<(), DomainError>;

    /// Atomically zero the accrued reward balance, returning what it held.
    /// A missing account holds nothing.
    async fn take_accrued_rewards(&self, id: &AccountId) -> Result<u32, DomainError>;

    /// Add previously taken periods back to the balance.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if no such account exists.
    async fn restore_accrued_rewards(
        &self,
        id: &AccountId,
        periods: u32,
    ) -> Result<(), DomainError>;
}
