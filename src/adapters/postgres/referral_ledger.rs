//! PostgreSQL implementation of ReferralLedger.
//!
//! Validation and accrual run as one statement through data-modifying CTEs,
//! so a referrer's balance can never be credited for a referral that some
//! other delivery validated first. A referee may hold several referrals;
//! each call acts on the oldest eligible one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AccountId, DomainError, ReferralEventId, Timestamp};
use crate::domain::referral::{
    RefereeCategory, ReferralEvent, ReferralStatus, ReferralValidation,
};
use crate::ports::ReferralLedger;

use super::account_store::periods_to_column;

pub struct PostgresReferralLedger {
    pool: PgPool,
}

impl PostgresReferralLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReferralRow {
    id: Uuid,
    referrer_id: Uuid,
    referee_id: Uuid,
    referee_category: String,
    status: String,
    credited: bool,
    referrer_reward_deferred: bool,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReferralRow> for ReferralEvent {
    type Error = DomainError;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        Ok(ReferralEvent {
            id: ReferralEventId::from_uuid(row.id),
            referrer_id: AccountId::from_uuid(row.referrer_id),
            referee_id: AccountId::from_uuid(row.referee_id),
            category: parse_category(&row.referee_category)?,
            status: parse_status(&row.status)?,
            credited: row.credited,
            referrer_reward_deferred: row.referrer_reward_deferred,
            created_at: Timestamp::from_datetime(row.created_at),
            validated_at: row.validated_at.map(Timestamp::from_datetime),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ValidationRow {
    id: Uuid,
    referrer_id: Uuid,
    referee_category: String,
    referrer_reward_deferred: bool,
}

impl TryFrom<ValidationRow> for ReferralValidation {
    type Error = DomainError;

    fn try_from(row: ValidationRow) -> Result<Self, Self::Error> {
        Ok(ReferralValidation {
            event_id: ReferralEventId::from_uuid(row.id),
            referrer_id: AccountId::from_uuid(row.referrer_id),
            category: parse_category(&row.referee_category)?,
            referrer_reward_deferred: row.referrer_reward_deferred,
        })
    }
}

fn parse_category(s: &str) -> Result<RefereeCategory, DomainError> {
    s.parse()
        .map_err(|_| DomainError::database(format!("Invalid referee category value: {}", s)))
}

fn parse_status(s: &str) -> Result<ReferralStatus, DomainError> {
    s.parse()
        .map_err(|_| DomainError::database(format!("Invalid referral status value: {}", s)))
}

#[async_trait]
impl ReferralLedger for PostgresReferralLedger {
    async fn validate_pending(
        &self,
        referee_id: &AccountId,
        referrer_accrual_periods: u32,
    ) -> Result<Option<ReferralValidation>, DomainError> {
        let row: Option<ValidationRow> = sqlx::query_as(
            r#"
            WITH target AS (
                SELECT id FROM referral_events
                WHERE referee_id = $1 AND status = 'pending'
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE
            ),
            validated AS (
                UPDATE referral_events r
                SET status = 'validated',
                    validated_at = NOW(),
                    referrer_reward_deferred = (
                        r.referee_category = 'entrepreneur'
                        AND EXISTS (
                            SELECT 1 FROM user_accounts a
                            WHERE a.id = r.referrer_id AND a.billing_customer_id IS NULL
                        )
                    )
                FROM target t
                WHERE r.id = t.id AND r.status = 'pending'
                RETURNING r.id, r.referrer_id, r.referee_category, r.referrer_reward_deferred
            ),
            accrued AS (
                UPDATE user_accounts a
                SET accrued_reward_periods = a.accrued_reward_periods + $2,
                    updated_at = NOW()
                FROM validated v
                WHERE a.id = v.referrer_id AND v.referrer_reward_deferred
                RETURNING a.id
            )
            SELECT id, referrer_id, referee_category, referrer_reward_deferred
            FROM validated
            "#,
        )
        .bind(referee_id.as_uuid())
        .bind(periods_to_column(referrer_accrual_periods)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to validate referral: {}", e)))?;

        row.map(ReferralValidation::try_from).transpose()
    }

    async fn find_uncredited_validated(
        &self,
        referee_id: &AccountId,
    ) -> Result<Option<ReferralEvent>, DomainError> {
        let row: Option<ReferralRow> = sqlx::query_as(
            r#"
            SELECT id, referrer_id, referee_id, referee_category, status, credited,
                   referrer_reward_deferred, created_at, validated_at
            FROM referral_events
            WHERE referee_id = $1 AND status = 'validated' AND credited = FALSE
            ORDER BY validated_at, created_at, id
            LIMIT 1
            "#,
        )
        .bind(referee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch referral: {}", e)))?;

        row.map(ReferralEvent::try_from).transpose()
    }

    async fn mark_credited(&self, id: &ReferralEventId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE referral_events
            SET credited = TRUE
            WHERE id = $1 AND status = 'validated' AND credited = FALSE
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark referral credited: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}
