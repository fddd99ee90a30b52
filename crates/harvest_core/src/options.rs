//! # Pipeline Options and Flags
//!
//! Two knobs control a run:
//!
//! - [`PipelineOptions`] travel with each `process` call and select which
//!   rule categories may run for that interaction.
//! - [`PipelineFlags`] are host-wide switches (enabled / debug) read through
//!   a [`FlagSource`] at the start of every call, so an operator can flip
//!   them at runtime without rebuilding the engine.

use std::sync::Arc;

use parking_lot::RwLock;

/// What kind of work a rule does. Drives option toggles and the ordering
/// checks performed when the engine is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Multiplies rewards by a tool trait tier.
    Multiplier,
    /// Chance-based extra drops.
    BonusDrop,
    /// Per-unit bonus from the actor's progression tier.
    TierBonus,
    /// Converts reward kinds (auto-smelt and friends).
    Conversion,
    /// Replants crops, consuming a seed from the rewards.
    Replant,
    /// Job currency payouts computed from final rewards.
    Currency,
    /// Experience computed from final rewards.
    Experience,
    /// Hands rewards to the actor or the world. Runs last.
    Delivery,
    /// Anything else; no ordering constraints.
    Custom,
}

/// Ordering role of a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleRole {
    /// Changes the reward list.
    RewardModifier,
    /// Reads the final reward list; must run after every modifier.
    Valuation,
    /// The single terminal rule; must run after everything else.
    Terminal,
    /// No constraints.
    Free,
}

impl RuleCategory {
    /// The ordering role for this category.
    #[must_use]
    pub const fn role(self) -> RuleRole {
        match self {
            Self::Multiplier
            | Self::BonusDrop
            | Self::TierBonus
            | Self::Conversion
            | Self::Replant => RuleRole::RewardModifier,
            Self::Currency | Self::Experience => RuleRole::Valuation,
            Self::Delivery => RuleRole::Terminal,
            Self::Custom => RuleRole::Free,
        }
    }

    /// The toggle bit for this category.
    #[must_use]
    pub const fn bit(self) -> RuleCategories {
        match self {
            Self::Multiplier => RuleCategories::MULTIPLIER,
            Self::BonusDrop => RuleCategories::BONUS_DROP,
            Self::TierBonus => RuleCategories::TIER_BONUS,
            Self::Conversion => RuleCategories::CONVERSION,
            Self::Replant => RuleCategories::REPLANT,
            Self::Currency => RuleCategories::CURRENCY,
            Self::Experience => RuleCategories::EXPERIENCE,
            Self::Delivery => RuleCategories::DELIVERY,
            Self::Custom => RuleCategories::CUSTOM,
        }
    }
}

/// Set of enabled rule categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleCategories(u32);

impl RuleCategories {
    /// No categories.
    pub const NONE: Self = Self(0);
    /// Yield multipliers.
    pub const MULTIPLIER: Self = Self(1 << 0);
    /// Bonus drop chances.
    pub const BONUS_DROP: Self = Self(1 << 1);
    /// Progression tier bonuses.
    pub const TIER_BONUS: Self = Self(1 << 2);
    /// Reward conversions.
    pub const CONVERSION: Self = Self(1 << 3);
    /// Crop replanting.
    pub const REPLANT: Self = Self(1 << 4);
    /// Currency payouts.
    pub const CURRENCY: Self = Self(1 << 5);
    /// Experience grants.
    pub const EXPERIENCE: Self = Self(1 << 6);
    /// Delivery.
    pub const DELIVERY: Self = Self(1 << 7);
    /// Custom rules.
    pub const CUSTOM: Self = Self(1 << 8);
    /// Every category.
    pub const ALL: Self = Self((1 << 9) - 1);

    /// Creates a set from its raw bits.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & Self::ALL.0)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks whether every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn has(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Adds categories.
    #[inline]
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Removes categories.
    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Checks whether a rule of `category` may run.
    #[inline]
    #[must_use]
    pub const fn allows(self, category: RuleCategory) -> bool {
        self.has(category.bit())
    }
}

impl Default for RuleCategories {
    fn default() -> Self {
        Self::ALL
    }
}

/// Per-call options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Which rule categories may run.
    pub categories: RuleCategories,
}

impl PipelineOptions {
    /// Options with every category enabled.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Options with only the given categories enabled.
    #[must_use]
    pub const fn only(categories: RuleCategories) -> Self {
        Self { categories }
    }

    /// Disables the given categories.
    #[must_use]
    pub const fn without(self, categories: RuleCategories) -> Self {
        Self {
            categories: self.categories.without(categories),
        }
    }
}

/// Host-wide switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineFlags {
    /// When false, `process` returns no result and the host falls back to
    /// its vanilla behaviour.
    pub enabled: bool,
    /// When true, the engine records and logs a per-rule trace.
    pub debug: bool,
}

impl Default for PipelineFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
        }
    }
}

/// Source of the current flags, re-read at the start of every call.
pub trait FlagSource: Send + Sync {
    /// The flags in effect right now.
    fn current(&self) -> PipelineFlags;
}

impl FlagSource for PipelineFlags {
    fn current(&self) -> PipelineFlags {
        *self
    }
}

/// Hot-reloadable flags shared between the host and the engine.
///
/// Cloning yields another handle to the same flags.
#[derive(Clone, Debug, Default)]
pub struct SharedFlags {
    inner: Arc<RwLock<PipelineFlags>>,
}

impl SharedFlags {
    /// Creates shared flags with an initial value.
    #[must_use]
    pub fn new(flags: PipelineFlags) -> Self {
        Self {
            inner: Arc::new(RwLock::new(flags)),
        }
    }

    /// Replaces all flags (config reload).
    pub fn replace(&self, flags: PipelineFlags) {
        *self.inner.write() = flags;
    }

    /// Flips the feature flag.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.write().enabled = enabled;
    }

    /// Flips the debug flag.
    pub fn set_debug(&self, debug: bool) {
        self.inner.write().debug = debug;
    }
}

impl FlagSource for SharedFlags {
    fn current(&self) -> PipelineFlags {
        *self.inner.read()
    }
}
