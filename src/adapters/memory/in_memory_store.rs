//! In-memory implementation of the three store ports.
//!
//! One mutex guards all state, so each port call is atomic in the same way
//! a single conditional SQL statement is. Used by tests and local runs
//! without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, ReferralEventId, Timestamp};
use crate::domain::referral::{ReferralEvent, ReferralStatus, ReferralValidation};
use crate::domain::subscription::{SubscriptionRecord, SubscriptionStatus};
use crate::ports::{AccountStore, ReferralLedger, SubscriptionStore};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, UserAccount>,
    subscriptions: HashMap<AccountId, SubscriptionRecord>,
    referrals: Vec<ReferralEvent>,
    fail_next_mark_credited: bool,
}

/// Accounts, subscriptions and referrals held in memory.
///
/// # Panics
///
/// The seeding and inspection helpers panic if the lock is poisoned. Port
/// methods return a `DomainError` instead.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "in-memory store lock poisoned"))
    }

    fn guard(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("InMemoryStore: lock poisoned")
    }

    // === Seeding and inspection helpers ===

    pub fn insert_account(&self, account: UserAccount) {
        self.guard().accounts.insert(account.id, account);
    }

    pub fn insert_subscription(&self, record: SubscriptionRecord) {
        self.guard().subscriptions.insert(record.account_id, record);
    }

    pub fn insert_referral(&self, event: ReferralEvent) {
        self.guard().referrals.push(event);
    }

    pub fn account(&self, id: &AccountId) -> Option<UserAccount> {
        self.guard().accounts.get(id).cloned()
    }

    pub fn subscription(&self, account_id: &AccountId) -> Option<SubscriptionRecord> {
        self.guard().subscriptions.get(account_id).cloned()
    }

    pub fn referral(&self, id: &ReferralEventId) -> Option<ReferralEvent> {
        self.guard().referrals.iter().find(|r| &r.id == id).cloned()
    }

    /// Makes the next `mark_credited` call fail with a database error.
    pub fn fail_next_mark_credited(&self) {
        self.guard().fail_next_mark_credited = true;
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find(&self, id: &AccountId) -> Result<Option<UserAccount>, DomainError> {
        Ok(self.lock()?.accounts.get(id).cloned())
    }

    async fn find_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.billing_customer_id.as_deref() == Some(customer_id))
            .map(|a| a.id))
    }

    async fn attach_billing_customer(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        match state.accounts.get_mut(id) {
            Some(account) if account.billing_customer_id.is_none() => {
                account.billing_customer_id = Some(customer_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_entitlement(&self, id: &AccountId, entitled: bool) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(id)
            .ok_or_else(|| DomainError::account_not_found(id))?;
        account.entitled = entitled;
        Ok(())
    }

    async fn take_accrued_rewards(&self, id: &AccountId) -> Result<u32, DomainError> {
        let mut state = self.lock()?;
        Ok(state
            .accounts
            .get_mut(id)
            .map(|account| std::mem::take(&mut account.accrued_reward_periods))
            .unwrap_or(0))
    }

    async fn restore_accrued_rewards(
        &self,
        id: &AccountId,
        periods: u32,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(id)
            .ok_or_else(|| DomainError::account_not_found(id))?;
        account.accrued_reward_periods = account.accrued_reward_periods.saturating_add(periods);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        self.lock()?
            .subscriptions
            .insert(record.account_id, record.clone());
        Ok(())
    }

    async fn set_status(
        &self,
        account_id: &AccountId,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let mut state = self.lock()?;
        Ok(state.subscriptions.get_mut(account_id).map(|record| {
            record.status = status;
            record.clone()
        }))
    }
}

#[async_trait]
impl ReferralLedger for InMemoryStore {
    async fn validate_pending(
        &self,
        referee_id: &AccountId,
        referrer_accrual_periods: u32,
    ) -> Result<Option<ReferralValidation>, DomainError> {
        let mut state = self.lock()?;
        let State {
            accounts, referrals, ..
        } = &mut *state;

        let Some(event) = referrals
            .iter_mut()
            .filter(|r| &r.referee_id == referee_id && r.status == ReferralStatus::Pending)
            .min_by_key(|r| r.created_at)
        else {
            return Ok(None);
        };

        event.status = ReferralStatus::Validated;
        event.validated_at = Some(Timestamp::now());

        if event.category.earns_event_credit() {
            if let Some(referrer) = accounts.get_mut(&event.referrer_id) {
                if referrer.billing_customer_id.is_none() {
                    referrer.accrued_reward_periods = referrer
                        .accrued_reward_periods
                        .saturating_add(referrer_accrual_periods);
                    event.referrer_reward_deferred = true;
                }
            }
        }

        Ok(Some(ReferralValidation {
            event_id: event.id,
            referrer_id: event.referrer_id,
            category: event.category,
            referrer_reward_deferred: event.referrer_reward_deferred,
        }))
    }

    async fn find_uncredited_validated(
        &self,
        referee_id: &AccountId,
    ) -> Result<Option<ReferralEvent>, DomainError> {
        Ok(self
            .lock()?
            .referrals
            .iter()
            .filter(|r| &r.referee_id == referee_id && r.awaiting_credit())
            .min_by_key(|r| (r.validated_at, r.created_at))
            .cloned())
    }

    async fn mark_credited(&self, id: &ReferralEventId) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        if std::mem::take(&mut state.fail_next_mark_credited) {
            return Err(DomainError::database("injected mark_credited failure"));
        }
        match state
            .referrals
            .iter_mut()
            .find(|r| &r.id == id && r.awaiting_credit())
        {
            Some(event) => {
                event.credited = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::referral::RefereeCategory;
    use crate::domain::subscription::PlanTier;

    fn record(account_id: AccountId, status: SubscriptionStatus) -> SubscriptionRecord {
        SubscriptionRecord {
            account_id,
            external_subscription_id: "sub_1".to_string(),
            billing_customer_id: Some("cus_1".to_string()),
            plan: PlanTier::Monthly,
            status,
            current_period_end: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Account Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn attach_billing_customer_only_when_absent() {
        let store = InMemoryStore::new();
        let id = AccountId::new();
        store.insert_account(UserAccount::new(id, "a@example.com"));

        assert!(store.attach_billing_customer(&id, "cus_1").await.unwrap());
        assert!(!store.attach_billing_customer(&id, "cus_2").await.unwrap());
        assert_eq!(
            store.account(&id).unwrap().billing_customer_id.as_deref(),
            Some("cus_1")
        );
        assert_eq!(store.find_by_billing_customer("cus_1").await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn take_accrued_rewards_zeroes_balance() {
        let store = InMemoryStore::new();
        let id = AccountId::new();
        store.insert_account(UserAccount::new(id, "a@example.com").with_accrued_reward_periods(5));

        assert_eq!(store.take_accrued_rewards(&id).await.unwrap(), 5);
        assert_eq!(store.take_accrued_rewards(&id).await.unwrap(), 0);

        store.restore_accrued_rewards(&id, 5).await.unwrap();
        assert_eq!(store.account(&id).unwrap().accrued_reward_periods, 5);
    }

    #[tokio::test]
    async fn writes_to_missing_account_match_postgres() {
        let store = InMemoryStore::new();
        let id = AccountId::new();

        let err = store.set_entitlement(&id, true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotFound);
        let err = store.restore_accrued_rewards(&id, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotFound);

        // Conditional writes simply match nothing.
        assert!(!store.attach_billing_customer(&id, "cus_1").await.unwrap());
        assert_eq!(store.take_accrued_rewards(&id).await.unwrap(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let store = InMemoryStore::new();
        let id = AccountId::new();

        store.upsert(&record(id, SubscriptionStatus::Trialing)).await.unwrap();
        store.upsert(&record(id, SubscriptionStatus::Active)).await.unwrap();

        assert_eq!(store.subscription(&id).unwrap().status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn set_status_reports_missing_row() {
        let store = InMemoryStore::new();
        let id = AccountId::new();

        assert!(store.set_status(&id, SubscriptionStatus::PastDue).await.unwrap().is_none());

        store.insert_subscription(record(id, SubscriptionStatus::Active));
        let updated = store.set_status(&id, SubscriptionStatus::PastDue).await.unwrap().unwrap();
        assert_eq!(updated.status, SubscriptionStatus::PastDue);
        assert_eq!(updated.external_subscription_id, "sub_1");
        assert_eq!(store.subscription(&id).unwrap().status, SubscriptionStatus::PastDue);
    }

    // ══════════════════════════════════════════════════════════════
    // Referral Ledger Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn validate_pending_transitions_once() {
        let store = InMemoryStore::new();
        let referee = AccountId::new();
        let event = ReferralEvent::pending(AccountId::new(), referee, RefereeCategory::Customer);
        store.insert_referral(event.clone());

        assert!(store.validate_pending(&referee, 3).await.unwrap().is_some());
        assert!(store.validate_pending(&referee, 3).await.unwrap().is_none());
        assert!(store.referral(&event.id).unwrap().validated_at.is_some());
    }

    #[tokio::test]
    async fn mark_credited_requires_validated_and_uncredited() {
        let store = InMemoryStore::new();
        let referee = AccountId::new();
        let event = ReferralEvent::pending(AccountId::new(), referee, RefereeCategory::Entrepreneur);
        store.insert_referral(event.clone());

        assert!(!store.mark_credited(&event.id).await.unwrap());

        store.validate_pending(&referee, 3).await.unwrap();
        assert!(store.mark_credited(&event.id).await.unwrap());
        assert!(!store.mark_credited(&event.id).await.unwrap());
        assert!(store.find_uncredited_validated(&referee).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn referee_with_several_referrals_is_handled_oldest_first() {
        let store = InMemoryStore::new();
        let referee = AccountId::new();
        let older = ReferralEvent::pending(AccountId::new(), referee, RefereeCategory::Entrepreneur);
        let mut newer =
            ReferralEvent::pending(AccountId::new(), referee, RefereeCategory::Entrepreneur);
        newer.created_at =
            Timestamp::from_datetime(*older.created_at.as_datetime() + chrono::Duration::seconds(60));
        // Seeded out of order.
        store.insert_referral(newer.clone());
        store.insert_referral(older.clone());

        let first = store.validate_pending(&referee, 3).await.unwrap().unwrap();
        assert_eq!(first.event_id, older.id);
        assert_eq!(
            store.find_uncredited_validated(&referee).await.unwrap().unwrap().id,
            older.id
        );

        let second = store.validate_pending(&referee, 3).await.unwrap().unwrap();
        assert_eq!(second.event_id, newer.id);
        assert!(store.validate_pending(&referee, 3).await.unwrap().is_none());

        assert!(store.mark_credited(&older.id).await.unwrap());
        assert_eq!(
            store.find_uncredited_validated(&referee).await.unwrap().unwrap().id,
            newer.id
        );
    }

    #[tokio::test]
    async fn injected_mark_failure_fires_once() {
        let store = InMemoryStore::new();
        let referee = AccountId::new();
        let event = ReferralEvent::pending(AccountId::new(), referee, RefereeCategory::Entrepreneur);
        store.insert_referral(event.clone());
        store.validate_pending(&referee, 3).await.unwrap();
        store.fail_next_mark_credited();

        assert!(store.mark_credited(&event.id).await.is_err());
        assert!(store.mark_credited(&event.id).await.unwrap());
    }
}
