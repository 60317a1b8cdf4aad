//! PostgreSQL implementation of AccountStore.
//!
//! Only the columns this engine owns are written here. Every write is a
//! single statement so concurrent deliveries serialise on the row lock.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::UserAccount;
use crate::domain::foundation::{AccountId, DomainError};
use crate::ports::AccountStore;

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    billing_customer_id: Option<String>,
    entitled: bool,
    accrued_reward_periods: i32,
}

impl TryFrom<AccountRow> for UserAccount {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            id: AccountId::from_uuid(row.id),
            email: row.email,
            billing_customer_id: row.billing_customer_id,
            entitled: row.entitled,
            accrued_reward_periods: periods_from_column(row.accrued_reward_periods)?,
        })
    }
}

pub(super) fn periods_from_column(value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::database(format!("Invalid accrued_reward_periods value: {}", value))
    })
}

pub(super) fn periods_to_column(value: u32) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::database(format!("Reward periods out of range: {}", value)))
}

/// Unconditional writes must hit exactly the one account row.
fn require_row(rows_affected: u64, id: &AccountId) -> Result<(), DomainError> {
    if rows_affected == 0 {
        return Err(DomainError::account_not_found(id));
    }
    Ok(())
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find(&self, id: &AccountId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, email, billing_customer_id, entitled, accrued_reward_periods
            FROM user_accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch account: {}", e)))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn find_by_billing_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<AccountId>, DomainError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM user_accounts WHERE billing_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to look up billing customer: {}", e))
        })?;

        Ok(id.map(AccountId::from_uuid))
    }

    async fn attach_billing_customer(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_accounts
            SET billing_customer_id = $2, updated_at = NOW()
            WHERE id = $1 AND billing_customer_id IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("user_accounts_billing_customer_id_key") {
                    return DomainError::database(format!(
                        "Billing customer {} already belongs to another account",
                        customer_id
                    ));
                }
            }
            DomainError::database(format!("Failed to attach billing customer: {}", e))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_entitlement(&self, id: &AccountId, entitled: bool) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_accounts
            SET entitled = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(entitled)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to set entitlement: {}", e)))?;

        require_row(result.rows_affected(), id)
    }

    async fn take_accrued_rewards(&self, id: &AccountId) -> Result<u32, DomainError> {
        // The self-join exposes the pre-update value under the row lock.
        let taken: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE user_accounts a
            SET accrued_reward_periods = 0, updated_at = NOW()
            FROM (
                SELECT id, accrued_reward_periods
                FROM user_accounts
                WHERE id = $1
                FOR UPDATE
            ) old
            WHERE a.id = old.id AND old.accrued_reward_periods > 0
            RETURNING old.accrued_reward_periods
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to take accrued rewards: {}", e)))?;

        taken.map(periods_from_column).transpose().map(|p| p.unwrap_or(0))
    }

    async fn restore_accrued_rewards(
        &self,
        id: &AccountId,
        periods: u32,
    ) -> Result<(), DomainError> {
        if periods == 0 {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE user_accounts
            SET accrued_reward_periods = accrued_reward_periods + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(periods_to_column(periods)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to restore accrued rewards: {}", e))
        })?;

        require_row(result.rows_affected(), id)
    }
}
