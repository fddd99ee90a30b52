//! # Effect Rules
//!
//! A rule is one unit of game-balance policy: a name, a priority, a
//! predicate and an action. Rules are built once at startup and reused for
//! every run, so they must not keep per-run state.

use crate::context::InteractionContext;
use crate::error::RuleOutcome;
use crate::options::RuleCategory;

/// Priority bands used by the stock rules. Lower runs first.
pub mod priority {
    /// Yield multipliers scale the base yield first.
    pub const MULTIPLIER: i32 = 100;
    /// Chance-based extra drops.
    pub const BONUS_DROP: i32 = 200;
    /// Progression tier bonuses.
    pub const TIER_BONUS: i32 = 300;
    /// Conversions see the fully multiplied rewards.
    pub const CONVERSION: i32 = 400;
    /// Replanting takes its seed after conversions.
    pub const REPLANT: i32 = 450;
    /// Currency payouts read final rewards.
    pub const CURRENCY: i32 = 800;
    /// Experience reads final rewards.
    pub const EXPERIENCE: i32 = 900;
    /// Delivery always runs last.
    pub const DELIVERY: i32 = 1000;
}

/// What a successful `apply` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleEffect {
    /// The rule changed the context; its name is marked applied.
    Fired,
    /// The rule ran but changed nothing (a failed roll, nothing to convert).
    NoEffect,
}

/// A unit of priority-ordered policy.
///
/// `applies` must be side-effect free. `apply` mutates the context through
/// its atomic operations and reports failures as a [`crate::RuleFault`];
/// the engine rolls the context back when it does.
pub trait EffectRule: Send + Sync {
    /// Unique name; reported in the applied set and in logs.
    fn name(&self) -> &str;

    /// Sort key; lower runs first, ties keep registration order.
    fn priority(&self) -> i32;

    /// Category, used for option toggles and ordering validation.
    fn category(&self) -> RuleCategory;

    /// Whether the rule wants to act on this context.
    fn applies(&self, context: &InteractionContext<'_>) -> bool;

    /// Acts on the context.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::RuleFault`] when the rule cannot complete. Any
    /// mutation made before the fault is rolled back by the engine.
    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome;
}
