//! Static quota policy table.
//!
//! Loaded as code rather than a runtime-mutable table so a mid-window policy
//! edit cannot silently invalidate in-flight reservations. Closed enums on
//! both axes make a missing `(tier, resource)` row unrepresentable; the
//! fail-closed-on-omission rule is discharged at parse time instead.

use serde::{Serialize, Serializer};
use std::fmt;

use super::tiers::EffectiveTier;

/// Revision of the quota table below. Reported alongside usage snapshots.
pub const POLICY_VERSION: &str = "quota-policy-v1";

/// key: entitlements-policy -> metered resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Message,
    Prompt,
    Voice,
    Decode,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Message,
        ResourceType::Prompt,
        ResourceType::Voice,
        ResourceType::Decode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Message => "message",
            ResourceType::Prompt => "prompt",
            ResourceType::Voice => "voice",
            ResourceType::Decode => "decode",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "message" => Some(ResourceType::Message),
            "prompt" => Some(ResourceType::Prompt),
            "voice" => Some(ResourceType::Voice),
            "decode" => Some(ResourceType::Decode),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulation window for a quota. Boundaries are calendar starts in UTC,
/// not per-user local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowKind {
    #[serde(rename = "dailyCalendar")]
    DailyCalendar,
    #[serde(rename = "monthlyCalendar")]
    MonthlyCalendar,
}

/// A per-window limit. Serializes as JSON `null` when unlimited so clients
/// never see a magic numeric sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimit {
    Unlimited,
    Capped(i64),
}

impl QuotaLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, QuotaLimit::Unlimited)
    }

    /// Whether this limit grants strictly more than `other`.
    pub fn exceeds(&self, other: QuotaLimit) -> bool {
        match (self, other) {
            (QuotaLimit::Unlimited, QuotaLimit::Unlimited) => false,
            (QuotaLimit::Unlimited, QuotaLimit::Capped(_)) => true,
            (QuotaLimit::Capped(_), QuotaLimit::Unlimited) => false,
            (QuotaLimit::Capped(a), QuotaLimit::Capped(b)) => *a > b,
        }
    }
}

impl Serialize for QuotaLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QuotaLimit::Unlimited => serializer.serialize_none(),
            QuotaLimit::Capped(n) => serializer.serialize_some(n),
        }
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRule {
    pub limit: QuotaLimit,
    pub window: WindowKind,
}

const fn capped(limit: i64, window: WindowKind) -> QuotaRule {
    QuotaRule {
        limit: QuotaLimit::Capped(limit),
        window,
    }
}

const fn unlimited(window: WindowKind) -> QuotaRule {
    QuotaRule {
        limit: QuotaLimit::Unlimited,
        window,
    }
}

/// key: entitlements-policy -> tier/resource quota matrix
pub fn rule(tier: EffectiveTier, resource: ResourceType) -> QuotaRule {
    use EffectiveTier::*;
    use ResourceType::*;
    use WindowKind::{DailyCalendar, MonthlyCalendar};

    match (tier, resource) {
        (Free, Message) => capped(3, DailyCalendar),
        (Free, Prompt) => capped(0, DailyCalendar),
        (Free, Voice) => capped(0, DailyCalendar),
        (Free, Decode) => capped(0, MonthlyCalendar),

        (Explorer, Message) => unlimited(DailyCalendar),
        (Explorer, Prompt) => unlimited(DailyCalendar),
        (Explorer, Voice) => unlimited(DailyCalendar),
        (Explorer, Decode) => capped(0, MonthlyCalendar),

        (Regulator, Message) => unlimited(DailyCalendar),
        (Regulator, Prompt) => unlimited(DailyCalendar),
        (Regulator, Voice) => capped(20, DailyCalendar),
        (Regulator, Decode) => capped(5, MonthlyCalendar),

        (Integrator, Message) => unlimited(DailyCalendar),
        (Integrator, Prompt) => unlimited(DailyCalendar),
        (Integrator, Voice) => unlimited(DailyCalendar),
        (Integrator, Decode) => unlimited(MonthlyCalendar),

        (Test, Message) => unlimited(DailyCalendar),
        (Test, Prompt) => unlimited(DailyCalendar),
        (Test, Voice) => unlimited(DailyCalendar),
        (Test, Decode) => unlimited(MonthlyCalendar),
    }
}

/// True when some purchasable tier above `tier` carries a higher limit for
/// `resource`. Drives the `upgradeRequired` flag on 429 responses; the test
/// tier is not purchasable and never counts.
pub fn upgrade_raises_limit(tier: EffectiveTier, resource: ResourceType) -> bool {
    const LADDER: [EffectiveTier; 4] = [
        EffectiveTier::Free,
        EffectiveTier::Explorer,
        EffectiveTier::Regulator,
        EffectiveTier::Integrator,
    ];
    let current = rule(tier, resource).limit;
    LADDER
        .iter()
        .filter(|candidate| candidate.ordinal() > tier.ordinal())
        .any(|candidate| rule(*candidate, resource).limit.exceeds(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_matrix() {
        assert_eq!(
            rule(EffectiveTier::Free, ResourceType::Message).limit,
            QuotaLimit::Capped(3)
        );
        assert_eq!(
            rule(EffectiveTier::Free, ResourceType::Prompt).limit,
            QuotaLimit::Capped(0)
        );
        assert_eq!(
            rule(EffectiveTier::Free, ResourceType::Decode).window,
            WindowKind::MonthlyCalendar
        );
    }

    #[test]
    fn regulator_has_capped_voice_and_decode() {
        assert_eq!(
            rule(EffectiveTier::Regulator, ResourceType::Voice).limit,
            QuotaLimit::Capped(20)
        );
        assert_eq!(
            rule(EffectiveTier::Regulator, ResourceType::Decode).limit,
            QuotaLimit::Capped(5)
        );
    }

    #[test]
    fn integrator_and_test_are_unlimited_everywhere() {
        for tier in [EffectiveTier::Integrator, EffectiveTier::Test] {
            for resource in ResourceType::ALL {
                assert!(rule(tier, resource).limit.is_unlimited());
            }
        }
    }

    #[test]
    fn upgrade_flag_tracks_the_ladder() {
        assert!(upgrade_raises_limit(
            EffectiveTier::Free,
            ResourceType::Message
        ));
        assert!(upgrade_raises_limit(
            EffectiveTier::Regulator,
            ResourceType::Voice
        ));
        assert!(upgrade_raises_limit(
            EffectiveTier::Regulator,
            ResourceType::Decode
        ));
        assert!(!upgrade_raises_limit(
            EffectiveTier::Integrator,
            ResourceType::Decode
        ));
    }

    #[test]
    fn unlimited_serializes_as_null() {
        assert_eq!(
            serde_json::to_value(QuotaLimit::Unlimited).unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            serde_json::to_value(QuotaLimit::Capped(5)).unwrap(),
            serde_json::json!(5)
        );
    }
}
