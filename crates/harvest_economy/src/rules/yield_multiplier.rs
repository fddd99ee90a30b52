//! # Yield Multiplier
//!
//! Scales every reward line by a factor read from the tool's yield-boost
//! traits. Two traits feed it:
//!
//! - the standard trait, levels I-III
//! - the extended trait, levels IV/V, leveled independently
//!
//! They are never summed. When a tool carries both, a [`TierTieBreak`]
//! policy picks exactly one.

use harvest_core::{
    priority, EffectRule, InteractionContext, RuleCategory, RuleEffect, RuleOutcome, SkillCategory,
    ToolSnapshot,
};
use serde::{Deserialize, Serialize};

use super::category_allowed;

/// Which trait wins when a tool carries both yield-boost traits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierTieBreak {
    /// The larger factor wins; equal factors keep the extended trait.
    #[default]
    LargerMultiplier,
    /// The higher raw trait level wins; equal levels keep the extended trait.
    HigherLevel,
    /// The extended trait always wins when present.
    PreferExtended,
    /// The standard trait always wins when present.
    PreferStandard,
}

/// Which trait supplied the factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoostSource {
    /// Standard levels I-III.
    Standard,
    /// Extended levels IV/V.
    Extended,
}

/// The resolved boost for a tool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boost {
    /// Winning trait.
    pub source: BoostSource,
    /// Its level on the tool.
    pub level: u8,
    /// The factor applied to every line.
    pub factor: f64,
}

/// Yield multiplier configuration (`[yield_multiplier]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldMultiplierSettings {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i32,
    /// Eligible categories; empty means all.
    pub categories: Vec<SkillCategory>,
    /// Standard trait id.
    pub standard_trait: String,
    /// Factors for standard levels, index 0 = level I.
    pub standard_factors: Vec<f64>,
    /// Extended trait id.
    pub extended_trait: String,
    /// Factors for extended levels, index 0 = the extended trait's level 1.
    pub extended_factors: Vec<f64>,
    /// Policy when both traits are present.
    pub tie_break: TierTieBreak,
}

impl Default for YieldMultiplierSettings {
    fn default() -> Self {
        Self {
            name: "yield_multiplier".to_string(),
            priority: priority::MULTIPLIER,
            categories: vec![
                SkillCategory::Mining,
                SkillCategory::Woodcutting,
                SkillCategory::Excavation,
                SkillCategory::Farming,
            ],
            standard_trait: "yield_boost".to_string(),
            standard_factors: vec![1.5, 2.0, 2.5],
            extended_trait: "yield_boost_extended".to_string(),
            extended_factors: vec![3.0, 3.5],
            tie_break: TierTieBreak::LargerMultiplier,
        }
    }
}

/// Scales rewards by the tool's best yield-boost trait.
#[derive(Clone, Debug)]
pub struct YieldMultiplier {
    settings: YieldMultiplierSettings,
}

impl YieldMultiplier {
    /// Creates the rule.
    #[must_use]
    pub fn new(settings: YieldMultiplierSettings) -> Self {
        Self { settings }
    }

    /// Resolves the boost a tool gets, if any.
    #[must_use]
    pub fn boost_for(&self, tool: &ToolSnapshot) -> Option<Boost> {
        let standard = lookup(
            tool,
            &self.settings.standard_trait,
            &self.settings.standard_factors,
            BoostSource::Standard,
        );
        let extended = lookup(
            tool,
            &self.settings.extended_trait,
            &self.settings.extended_factors,
            BoostSource::Extended,
        );

        match (standard, extended) {
            (Some(standard), Some(extended)) => Some(self.break_tie(standard, extended)),
            (standard, extended) => standard.or(extended),
        }
    }

    fn break_tie(&self, standard: Boost, extended: Boost) -> Boost {
        match self.settings.tie_break {
            TierTieBreak::LargerMultiplier => {
                if standard.factor > extended.factor {
                    standard
                } else {
                    extended
                }
            }
            TierTieBreak::HigherLevel => {
                if standard.level > extended.level {
                    standard
                } else {
                    extended
                }
            }
            TierTieBreak::PreferExtended => extended,
            TierTieBreak::PreferStandard => standard,
        }
    }
}

/// Factor for a trait level. Levels past the table use its last entry.
fn lookup(tool: &ToolSnapshot, trait_id: &str, factors: &[f64], source: BoostSource) -> Option<Boost> {
    let level = tool.level(trait_id)?;
    let index = usize::from(level).saturating_sub(1).min(factors.len().checked_sub(1)?);
    let factor = *factors.get(index)?;
    Some(Boost {
        source,
        level,
        factor,
    })
}

impl EffectRule for YieldMultiplier {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Multiplier
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        category_allowed(&self.settings.categories, context.subject().category)
            && !context.rewards().is_empty()
            && self.boost_for(context.tool()).is_some()
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let Some(boost) = self.boost_for(context.tool()) else {
            return Ok(RuleEffect::NoEffect);
        };
        tracing::trace!(
            source = ?boost.source,
            level = boost.level,
            factor = boost.factor,
            "yield boost"
        );
        context.scale_rewards(boost.factor);
        Ok(RuleEffect::Fired)
    }
}
