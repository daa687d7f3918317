//! Append-only usage ledger.
//!
//! One row per successful metered action, never updated or deleted here.
//! All windowed counting goes through this module so the enforcer and the
//! display snapshot agree on what "used" means.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::PgPool;

use super::policy::{ResourceType, WindowKind};

/// Start of the window containing `now`. Calendar boundaries in UTC,
/// service-wide; never server-local time.
pub fn window_start(window: WindowKind, now: DateTime<Utc>) -> DateTime<Utc> {
    match window {
        WindowKind::DailyCalendar => Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .expect("midnight UTC is unambiguous"),
        WindowKind::MonthlyCalendar => Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .expect("first of month UTC is unambiguous"),
    }
}

pub(crate) async fn count_events<'e, E>(
    executor: E,
    account_id: i32,
    resource: ResourceType,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM usage_events
         WHERE account_id = $1 AND resource_type = $2 AND occurred_at >= $3",
    )
    .bind(account_id)
    .bind(resource.as_str())
    .bind(since)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_event<'e, E>(
    executor: E,
    account_id: i32,
    resource: ResourceType,
    occurred_at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query("INSERT INTO usage_events (account_id, resource_type, occurred_at) VALUES ($1, $2, $3)")
        .bind(account_id)
        .bind(resource.as_str())
        .bind(occurred_at)
        .execute(executor)
        .await?;
    Ok(())
}

/// key: entitlements-ledger -> windowed counts over usage_events
#[derive(Clone)]
pub struct UsageLedger {
    pool: PgPool,
}

impl UsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_in_window(
        &self,
        account_id: i32,
        resource: ResourceType,
        window_start: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        count_events(&self.pool, account_id, resource, window_start).await
    }

    /// Durably appends one event; committed before this returns, since the
    /// next request from the same account may depend on the updated count.
    pub async fn record(
        &self,
        account_id: i32,
        resource: ResourceType,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        insert_event(&self.pool, account_id, resource, occurred_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn daily_window_starts_at_midnight_utc() {
        let now = utc(2026, 3, 14, 17, 45, 12);
        assert_eq!(
            window_start(WindowKind::DailyCalendar, now),
            utc(2026, 3, 14, 0, 0, 0)
        );
    }

    #[test]
    fn daily_window_resets_at_the_first_instant_of_the_next_day() {
        let end_of_day = utc(2026, 3, 14, 23, 59, 59);
        let next_day = end_of_day + Duration::seconds(1);
        assert_eq!(
            window_start(WindowKind::DailyCalendar, next_day),
            utc(2026, 3, 15, 0, 0, 0)
        );
        assert_ne!(
            window_start(WindowKind::DailyCalendar, end_of_day),
            window_start(WindowKind::DailyCalendar, next_day)
        );
    }

    #[test]
    fn monthly_window_starts_on_the_first() {
        let now = utc(2026, 1, 31, 12, 0, 0);
        assert_eq!(
            window_start(WindowKind::MonthlyCalendar, now),
            utc(2026, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn monthly_window_resets_even_when_fewer_than_thirty_days_elapsed() {
        // January usage does not count against February, short month or not.
        let late_january = utc(2026, 1, 31, 23, 0, 0);
        let early_february = utc(2026, 2, 1, 0, 0, 0);
        assert_eq!(
            window_start(WindowKind::MonthlyCalendar, early_february),
            early_february
        );
        assert!(
            window_start(WindowKind::MonthlyCalendar, late_january)
                < window_start(WindowKind::MonthlyCalendar, early_february)
        );
    }
}
