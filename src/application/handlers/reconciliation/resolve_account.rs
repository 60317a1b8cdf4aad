//! Two-path account resolution: metadata first, billing identity second.

use std::sync::Arc;

use crate::domain::foundation::AccountId;
use crate::ports::AccountStore;

use super::reconcile_error::ReconcileError;

/// How an event was matched to an internal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountResolution {
    ByMetadata(AccountId),
    ByBillingIdentity(AccountId),
    NotFound,
}

impl AccountResolution {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            AccountResolution::ByMetadata(id) | AccountResolution::ByBillingIdentity(id) => {
                Some(*id)
            }
            AccountResolution::NotFound => None,
        }
    }
}

pub struct AccountResolver {
    accounts: Arc<dyn AccountStore>,
}

impl AccountResolver {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Resolves an account from an optional metadata hint and an optional
    /// billing customer id.
    ///
    /// A hint is only trusted if it names an existing account. Otherwise the
    /// customer id is used for a reverse lookup.
    pub async fn resolve(
        &self,
        hint: Option<&str>,
        customer_id: Option<&str>,
    ) -> Result<AccountResolution, ReconcileError> {
        if let Some(raw) = hint {
            match raw.parse::<AccountId>() {
                Ok(id) => {
                    if self.accounts.find(&id).await?.is_some() {
                        return Ok(AccountResolution::ByMetadata(id));
                    }
                    tracing::debug!(account_id = %id, "Metadata account id has no account");
                }
                Err(_) => {
                    tracing::debug!(hint = raw, "Metadata account id is not a valid id");
                }
            }
        }

        if let Some(customer_id) = customer_id {
            if let Some(id) = self.accounts.find_by_billing_customer(customer_id).await? {
                return Ok(AccountResolution::ByBillingIdentity(id));
            }
        }

        Ok(AccountResolution::NotFound)
    }
}
