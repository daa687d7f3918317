pub mod api;
pub mod enforcer;
pub mod ledger;
pub mod policy;
pub mod tiers;

pub use enforcer::{Decision, QuotaEnforcer, QuotaError};
pub use ledger::UsageLedger;
pub use policy::{QuotaLimit, QuotaRule, ResourceType, WindowKind};
pub use tiers::{resolve_tier, EffectiveTier};
