use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tokio::time::{self, Duration as TokioDuration};
use tracing::{info, warn};

use crate::config;
use crate::error::{AppError, AppResult};

/// Subscriber row as read from `users`. Status and tier stay TEXT in the
/// store and are parsed fail-closed at resolution time, so an unrecognized
/// value degrades access instead of being unrepresentable.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub subscription_status: String,
    pub subscription_tier: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub test_override: bool,
}

pub async fn fetch_account(pool: &PgPool, account_id: i32) -> AppResult<Account> {
    let account: Option<Account> = sqlx::query_as(
        "SELECT id, email, subscription_status, subscription_tier, trial_ends_at, test_override
         FROM users WHERE id = $1",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await?;
    // A valid token for a deleted row is an identity problem, not a free-tier
    // downgrade.
    account.ok_or(AppError::Unauthorized)
}

/// key: accounts-sweeper -> persist lapsed trials
///
/// Reconciliation only: the resolver already derives expiry at read time, so
/// nothing is gated on this sweep ever running. A trial row with no end
/// timestamp is corrupt and flips too.
pub async fn sweep_lapsed_trials(pool: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE users SET subscription_status = 'expired'
         WHERE subscription_status = 'trial'
           AND (trial_ends_at IS NULL OR trial_ends_at <= $1)",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub fn spawn_trial_sweeper(pool: PgPool) {
    let interval = TokioDuration::from_secs(*config::TRIAL_SWEEP_INTERVAL_SECS);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep_lapsed_trials(&pool, Utc::now()).await {
                Ok(0) => {}
                Ok(flipped) => info!(flipped, "marked lapsed trials expired"),
                Err(err) => warn!(?err, "trial sweep failed"),
            }
        }
    });
}
