//! PostgreSQL implementation of SubscriptionStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AccountId, DomainError, Timestamp};
use crate::domain::subscription::{PlanTier, SubscriptionRecord, SubscriptionStatus};
use crate::ports::SubscriptionStore;

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    account_id: Uuid,
    external_subscription_id: String,
    billing_customer_id: Option<String>,
    plan: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            account_id: AccountId::from_uuid(row.account_id),
            external_subscription_id: row.external_subscription_id,
            billing_customer_id: row.billing_customer_id,
            plan: parse_plan(&row.plan)?,
            status: parse_status(&row.status)?,
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
        })
    }
}

fn parse_plan(s: &str) -> Result<PlanTier, DomainError> {
    s.parse()
        .map_err(|_| DomainError::database(format!("Invalid plan value: {}", s)))
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse()
        .map_err(|_| DomainError::database(format!("Invalid status value: {}", s)))
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                account_id, external_subscription_id, billing_customer_id,
                plan, status, current_period_end, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (account_id) DO UPDATE SET
                external_subscription_id = EXCLUDED.external_subscription_id,
                billing_customer_id = EXCLUDED.billing_customer_id,
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = NOW()
            "#,
        )
        .bind(record.account_id.as_uuid())
        .bind(&record.external_subscription_id)
        .bind(&record.billing_customer_id)
        .bind(record.plan.as_str())
        .bind(record.status.as_str())
        .bind(record.current_period_end.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_foreign_key_violation() {
                    return DomainError::database(format!(
                        "No account {} for subscription {}",
                        record.account_id, record.external_subscription_id
                    ));
                }
            }
            DomainError::database(format!("Failed to upsert subscription: {}", e))
        })?;

        Ok(())
    }

    async fn set_status(
        &self,
        account_id: &AccountId,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            UPDATE subscriptions
            SET status = $2, updated_at = NOW()
            WHERE account_id = $1
            RETURNING account_id, external_subscription_id, billing_customer_id,
                      plan, status, current_period_end
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription status: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }
}
