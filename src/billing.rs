//! Billing-state boundary.
//!
//! Subscription transitions happen at the payment provider; they land here
//! through a signed webhook that mutates the account row. No checkout or
//! payment logic lives in this service.

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::accounts;
use crate::config;
use crate::entitlements::tiers::{resolve_tier, EffectiveTier, PaidTier, SubscriptionStatus};
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

#[derive(Debug, Deserialize)]
pub struct BillingWebhookEvent {
    pub id: Uuid,
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubscriptionUpdated {
    account_id: i32,
    status: String,
    tier: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionCanceled {
    account_id: i32,
}

/// key: billing-webhook -> signed subscription transitions
///
/// HMAC-SHA256 over the raw body, hex-encoded in `x-billing-signature` as
/// `sha256=<digest>`. Deliveries are idempotent by event id: the event row
/// insert and the account mutation share one transaction, so a retry can
/// never half-apply.
pub async fn billing_webhook(
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let secret = config::BILLING_WEBHOOK_SECRET
        .as_deref()
        .ok_or_else(|| AppError::Message("BILLING_WEBHOOK_SECRET is not configured".into()))?;

    let sig = headers
        .get("x-billing-signature")
        .ok_or(AppError::BadRequest("Missing signature".into()))?
        .to_str()
        .map_err(|_| AppError::BadRequest("Bad signature".into()))?;
    let expected = {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can use any key length");
        mac.update(&body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    };
    if expected != sig {
        return Err(AppError::Unauthorized);
    }

    let payload: BillingWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {e}")))?;

    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        "INSERT INTO billing_webhook_events (id, event) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
    )
    .bind(payload.id)
    .bind(&payload.event)
    .execute(&mut tx)
    .await?
    .rows_affected();
    if inserted == 0 {
        tx.rollback().await?;
        return Ok(StatusCode::OK);
    }

    match payload.event.as_str() {
        "subscription.updated" => {
            let update: SubscriptionUpdated = serde_json::from_value(payload.data)
                .map_err(|e| AppError::BadRequest(format!("Invalid event data: {e}")))?;
            if SubscriptionStatus::parse(&update.status).is_none() {
                warn!(event = %payload.id, status = %update.status, "webhook carried unknown subscription status");
            }
            if PaidTier::parse(&update.tier).is_none() {
                warn!(event = %payload.id, tier = %update.tier, "webhook carried unknown subscription tier");
            }
            // Stored as-is; the resolver fails closed on anything unknown.
            let updated = sqlx::query(
                "UPDATE users SET subscription_status = $2, subscription_tier = $3 WHERE id = $1",
            )
            .bind(update.account_id)
            .bind(&update.status)
            .bind(&update.tier)
            .execute(&mut tx)
            .await?
            .rows_affected();
            if updated == 0 {
                warn!(event = %payload.id, account_id = update.account_id, "webhook for unknown account");
            }
        }
        "subscription.canceled" => {
            let cancel: SubscriptionCanceled = serde_json::from_value(payload.data)
                .map_err(|e| AppError::BadRequest(format!("Invalid event data: {e}")))?;
            let updated =
                sqlx::query("UPDATE users SET subscription_status = 'canceled' WHERE id = $1")
                    .bind(cancel.account_id)
                    .execute(&mut tx)
                    .await?
                    .rows_affected();
            if updated == 0 {
                warn!(event = %payload.id, account_id = cancel.account_id, "webhook for unknown account");
            }
        }
        other => {
            tracing::debug!(event = %payload.id, kind = other, "ignoring unhandled billing event");
        }
    }

    tx.commit().await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub status: String,
    /// Raw purchased tier; advisory unless the status is `active`.
    pub tier: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// What the account is actually granted right now.
    pub effective_tier: EffectiveTier,
}

pub async fn subscription(
    Extension(pool): Extension<PgPool>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<SubscriptionView>> {
    let account = accounts::fetch_account(&pool, user_id).await?;
    let effective_tier = resolve_tier(&account, Utc::now());
    Ok(Json(SubscriptionView {
        status: account.subscription_status,
        tier: account.subscription_tier,
        trial_ends_at: account.trial_ends_at,
        effective_tier,
    }))
}

pub fn routes() -> Router {
    Router::new()
        .route("/api/billing/webhook", post(billing_webhook))
        .route("/api/billing/subscription", get(subscription))
}
