//! Quota enforcement.
//!
//! `check_and_reserve` is the only path that consumes quota. Check and
//! record are one short transaction serialized on the account row, so two
//! concurrent requests for the last unit cannot both be allowed. The
//! external action itself runs after commit; no quota lock is ever held
//! across a provider call.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::accounts::Account;
use crate::error::AppError;

use super::ledger::{self, window_start};
use super::policy::{self, QuotaLimit, ResourceType};
use super::tiers::{resolve_tier, EffectiveTier};

/// Outcome of one quota check. `used` and `remaining` describe the window
/// before the reservation: a successful reserve of the last unit reports
/// `remaining = 1`.
#[derive(Debug, Clone)]
pub struct Decision {
    pub allowed: bool,
    pub tier: EffectiveTier,
    pub resource: ResourceType,
    pub used: i64,
    pub limit: QuotaLimit,
    pub remaining: QuotaLimit,
}

impl Decision {
    fn evaluate(
        tier: EffectiveTier,
        resource: ResourceType,
        used: i64,
        limit: QuotaLimit,
    ) -> Decision {
        match limit {
            QuotaLimit::Unlimited => Decision {
                allowed: true,
                tier,
                resource,
                used,
                limit,
                remaining: QuotaLimit::Unlimited,
            },
            QuotaLimit::Capped(cap) => Decision {
                allowed: used < cap,
                tier,
                resource,
                used,
                limit,
                remaining: QuotaLimit::Capped((cap - used).max(0)),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("account not found")]
    AccountMissing,
}

impl From<QuotaError> for AppError {
    fn from(err: QuotaError) -> Self {
        match err {
            // Store failures fail closed as a retryable 5xx, never as a
            // false "quota exceeded".
            QuotaError::Db(e) => AppError::Db(e),
            QuotaError::AccountMissing => AppError::Unauthorized,
        }
    }
}

/// key: entitlements-enforcer -> check-and-reserve
#[derive(Clone)]
pub struct QuotaEnforcer {
    pool: PgPool,
}

impl QuotaEnforcer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserves one unit of quota, or denies without consuming anything.
    ///
    /// One transaction: lock the account row, re-resolve the tier from the
    /// locked row, append the usage event, re-count the window, and roll
    /// the append back when a finite limit is already spent. The row lock
    /// serializes concurrent reservations for the same account.
    pub async fn check_and_reserve(
        &self,
        account_id: i32,
        resource: ResourceType,
        now: DateTime<Utc>,
    ) -> Result<Decision, QuotaError> {
        let mut tx = self.pool.begin().await?;

        let account: Option<Account> = sqlx::query_as(
            "SELECT id, email, subscription_status, subscription_tier, trial_ends_at, test_override
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(account_id)
        .fetch_optional(&mut tx)
        .await?;
        let account = account.ok_or(QuotaError::AccountMissing)?;

        let tier = resolve_tier(&account, now);
        let rule = policy::rule(tier, resource);
        let since = window_start(rule.window, now);

        // Reserve first; the appended event participates in the recount.
        ledger::insert_event(&mut tx, account_id, resource, now).await?;
        let total = ledger::count_events(&mut tx, account_id, resource, since).await?;
        let used_before = total - 1;

        let decision = Decision::evaluate(tier, resource, used_before, rule.limit);
        if decision.allowed {
            tx.commit().await?;
            tracing::debug!(
                account_id,
                resource = %resource,
                tier = %tier,
                used = used_before,
                "quota unit reserved"
            );
        } else {
            tx.rollback().await?;
            tracing::info!(
                account_id,
                resource = %resource,
                tier = %tier,
                used = used_before,
                "quota reservation denied"
            );
        }
        Ok(decision)
    }

    /// Read-only snapshot for display. Takes no lock and reserves nothing;
    /// never used to authorize consumption.
    pub async fn check(
        &self,
        account: &Account,
        resource: ResourceType,
        now: DateTime<Utc>,
    ) -> Result<Decision, QuotaError> {
        let tier = resolve_tier(account, now);
        let rule = policy::rule(tier, resource);
        let since = window_start(rule.window, now);
        let used = ledger::count_events(&self.pool, account.id, resource, since).await?;
        Ok(Decision::evaluate(tier, resource, used, rule.limit))
    }
}
