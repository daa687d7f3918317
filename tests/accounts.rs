use attune_backend::accounts::{sweep_lapsed_trials, Account};
use attune_backend::entitlements::tiers::{resolve_tier, EffectiveTier};
use chrono::{Duration, Utc};
use sqlx::PgPool;

async fn seed_trial(pool: &PgPool, email: &str, ends_at: Option<chrono::DateTime<Utc>>) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, subscription_status, trial_ends_at)
         VALUES ($1, 'hashed', 'trial', $2) RETURNING id",
    )
    .bind(email)
    .bind(ends_at)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn load_account(pool: &PgPool, account_id: i32) -> Account {
    sqlx::query_as(
        "SELECT id, email, subscription_status, subscription_tier, trial_ends_at, test_override
         FROM users WHERE id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

// key: accounts-tests -> sweeper reconciles lapsed trials
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn sweeper_flips_only_lapsed_trials(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let now = Utc::now();

    let lapsed = seed_trial(&pool, "lapsed@example.com", Some(now - Duration::days(1))).await;
    let corrupt = seed_trial(&pool, "corrupt@example.com", None).await;
    let running = seed_trial(&pool, "running@example.com", Some(now + Duration::days(7))).await;
    let paying: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, subscription_status, subscription_tier)
         VALUES ('paying@example.com', 'hashed', 'active', 'integrator') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let flipped = sweep_lapsed_trials(&pool, now).await.unwrap();
    assert_eq!(flipped, 2);

    assert_eq!(
        load_account(&pool, lapsed).await.subscription_status,
        "expired"
    );
    assert_eq!(
        load_account(&pool, corrupt).await.subscription_status,
        "expired"
    );
    assert_eq!(
        load_account(&pool, running).await.subscription_status,
        "trial"
    );
    assert_eq!(
        load_account(&pool, paying).await.subscription_status,
        "active"
    );
}

// The sweep is pure reconciliation: the resolver already derived the lapse
// at read time, so its output must be identical before and after.
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn sweep_does_not_change_resolved_tier(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let now = Utc::now();

    let lapsed = seed_trial(&pool, "derived@example.com", Some(now - Duration::hours(1))).await;

    let before = resolve_tier(&load_account(&pool, lapsed).await, now);
    assert_eq!(before, EffectiveTier::Free);

    sweep_lapsed_trials(&pool, now).await.unwrap();

    let after = resolve_tier(&load_account(&pool, lapsed).await, now);
    assert_eq!(after, before);
}
