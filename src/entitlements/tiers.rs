//! Effective-tier resolution.
//!
//! The tier stored on an account row is advisory: a trial silently lapses at
//! `trial_ends_at` without any write, so every gating decision re-derives the
//! effective tier from the row and the current time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::accounts::Account;

/// key: entitlements-status -> stored subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Canceled,
}

impl SubscriptionStatus {
    /// Unknown strings yield `None`; callers treat that as the most
    /// restrictive state.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "trial" => Some(SubscriptionStatus::Trial),
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// Purchasable tiers, as stored on the account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidTier {
    Free,
    Explorer,
    Regulator,
    Integrator,
}

impl PaidTier {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(PaidTier::Free),
            "explorer" => Some(PaidTier::Explorer),
            "regulator" => Some(PaidTier::Regulator),
            "integrator" => Some(PaidTier::Integrator),
            _ => None,
        }
    }
}

/// key: entitlements-tier -> derived access level
///
/// Derived per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveTier {
    Free,
    Explorer,
    Regulator,
    Integrator,
    Test,
}

impl EffectiveTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveTier::Free => "free",
            EffectiveTier::Explorer => "explorer",
            EffectiveTier::Regulator => "regulator",
            EffectiveTier::Integrator => "integrator",
            EffectiveTier::Test => "test",
        }
    }

    /// Position on the access ladder, for feature-gate comparisons.
    /// Kept out of [`resolve_tier`] itself: resolution is exact-match, the
    /// ladder only exists for "at least tier X" checks.
    pub fn ordinal(&self) -> u8 {
        match self {
            EffectiveTier::Free => 0,
            EffectiveTier::Explorer => 1,
            EffectiveTier::Regulator => 2,
            EffectiveTier::Integrator => 3,
            EffectiveTier::Test => 4,
        }
    }

    pub fn at_least(&self, floor: EffectiveTier) -> bool {
        self.ordinal() >= floor.ordinal()
    }
}

impl fmt::Display for EffectiveTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PaidTier> for EffectiveTier {
    fn from(tier: PaidTier) -> Self {
        match tier {
            PaidTier::Free => EffectiveTier::Free,
            PaidTier::Explorer => EffectiveTier::Explorer,
            PaidTier::Regulator => EffectiveTier::Regulator,
            PaidTier::Integrator => EffectiveTier::Integrator,
        }
    }
}

/// key: entitlements-resolver -> account state + time -> tier
///
/// Pure and total. Evaluation order is fixed: test override, then trial
/// window, then active subscription, then everything else falls to `free`.
/// Unrecognized stored values always fail closed.
pub fn resolve_tier(account: &Account, now: DateTime<Utc>) -> EffectiveTier {
    if account.test_override {
        return EffectiveTier::Test;
    }
    match SubscriptionStatus::parse(&account.subscription_status) {
        Some(SubscriptionStatus::Trial) => match account.trial_ends_at {
            // Boundary is exclusive on the trial side: at `trial_ends_at`
            // the trial has lapsed. A trial row with no end timestamp is
            // treated as already expired.
            Some(ends_at) if now < ends_at => EffectiveTier::Explorer,
            _ => EffectiveTier::Free,
        },
        Some(SubscriptionStatus::Active) => match PaidTier::parse(&account.subscription_tier) {
            Some(tier) => tier.into(),
            None => {
                tracing::warn!(
                    account_id = account.id,
                    tier = %account.subscription_tier,
                    "unrecognized subscription tier on active account, resolving to free"
                );
                EffectiveTier::Free
            }
        },
        Some(SubscriptionStatus::Expired) | Some(SubscriptionStatus::Canceled) => {
            EffectiveTier::Free
        }
        None => {
            tracing::warn!(
                account_id = account.id,
                status = %account.subscription_status,
                "unrecognized subscription status, resolving to free"
            );
            EffectiveTier::Free
        }
    }
}
