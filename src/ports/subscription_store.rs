//! SubscriptionStore port - one subscription row per account.

use async_trait::async_trait;

use crate::domain::foundation::{AccountId, DomainError};
use crate::domain::subscription::{SubscriptionRecord, SubscriptionStatus};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or fully replace the row keyed by `record.account_id`.
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Overwrite only the status and return the updated row.
    ///
    /// Returns `None` if the account has no subscription row.
    async fn set_status(
        &self,
        account_id: &AccountId,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;
}
