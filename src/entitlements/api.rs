//! Usage display endpoint and the shared metered-response envelope.

use axum::{extract::Extension, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use crate::accounts;
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

use super::enforcer::{Decision, QuotaEnforcer};
use super::policy::{self, QuotaLimit, ResourceType, WindowKind, POLICY_VERSION};
use super::tiers::{resolve_tier, EffectiveTier};

/// Usage figures for one resource. `limit`/`remaining` serialize as `null`
/// when unlimited.
#[derive(Debug, Clone, Serialize)]
pub struct UsageInfo {
    pub used: i64,
    pub limit: QuotaLimit,
    pub remaining: QuotaLimit,
}

/// 200 envelope shared by every metered action handler.
#[derive(Debug, Serialize)]
pub struct MeteredResponse<T: Serialize> {
    pub result: T,
    pub usage: UsageInfo,
    pub tier: EffectiveTier,
}

impl Decision {
    pub fn usage_info(&self) -> UsageInfo {
        UsageInfo {
            used: self.used,
            limit: self.limit,
            remaining: self.remaining,
        }
    }

    /// Maps a denial to its wire error: 403 when the tier has no access to
    /// the resource at all, 429 when a positive limit is exhausted.
    pub fn deny_error(&self) -> AppError {
        match self.limit {
            QuotaLimit::Capped(0) => AppError::UpgradeRequired {
                tier: self.tier,
                resource: self.resource,
            },
            _ => AppError::QuotaExhausted {
                resource: self.resource,
                usage: self.usage_info(),
                upgrade_required: policy::upgrade_raises_limit(self.tier, self.resource),
            },
        }
    }

    pub fn into_envelope<T: Serialize>(self, result: T) -> MeteredResponse<T> {
        MeteredResponse {
            result,
            usage: self.usage_info(),
            tier: self.tier,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceUsage {
    pub resource: ResourceType,
    pub window: WindowKind,
    #[serde(flatten)]
    pub usage: UsageInfo,
}

#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub tier: EffectiveTier,
    pub policy_version: &'static str,
    pub resources: Vec<ResourceUsage>,
}

/// Display-only snapshot across all metered resources. Clients may render
/// it but never rely on it: every consumption is re-validated server-side.
pub async fn usage_summary(
    Extension(pool): Extension<PgPool>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<UsageSummary>> {
    let account = accounts::fetch_account(&pool, user_id).await?;
    let now = Utc::now();
    let tier = resolve_tier(&account, now);
    let enforcer = QuotaEnforcer::new(pool);

    let mut resources = Vec::with_capacity(ResourceType::ALL.len());
    for resource in ResourceType::ALL {
        let decision = enforcer.check(&account, resource, now).await?;
        resources.push(ResourceUsage {
            resource,
            window: policy::rule(tier, resource).window,
            usage: decision.usage_info(),
        });
    }

    Ok(Json(UsageSummary {
        tier,
        policy_version: POLICY_VERSION,
        resources,
    }))
}

pub fn routes() -> Router {
    Router::new().route("/api/usage", get(usage_summary))
}
