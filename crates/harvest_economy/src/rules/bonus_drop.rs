//! # Bonus Drop Chance
//!
//! One rule instance per configured tool trait. Each instance rolls once per
//! run, independently of every other instance, so a tool carrying two bonus
//! traits can win both.

use harvest_core::{
    clamp_chance, priority, EffectRule, InteractionContext, ItemId, RuleCategory, RuleEffect,
    RuleOutcome, SkillCategory, TriggerKind,
};
use serde::{Deserialize, Serialize};

use super::category_allowed;

/// What a winning roll does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusEffect {
    /// Scales every existing line.
    Multiply {
        /// Factor, rounded up per line.
        factor: f64,
    },
    /// Adds a reward line (merging into an existing one of the same kind).
    Append {
        /// Item added.
        item_id: ItemId,
        /// Units added.
        quantity: u32,
    },
}

/// Bonus drop configuration (`[[bonus_drop]]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BonusDropSettings {
    /// Rule name; must be unique across the pipeline.
    pub name: String,
    /// Rule priority.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Tool trait that enables the roll.
    pub trait_id: String,
    /// Chance at trait level 1.
    pub base_chance: f64,
    /// Extra chance per level above 1.
    #[serde(default)]
    pub per_level: f64,
    /// Eligible categories; empty means all.
    #[serde(default)]
    pub categories: Vec<SkillCategory>,
    /// Effect on a winning roll.
    pub effect: BonusEffect,
    /// Also roll for chained triggers (multi-break).
    #[serde(default)]
    pub chained: bool,
}

const fn default_priority() -> i32 {
    priority::BONUS_DROP
}

/// Chance-based extra drops for one trait.
#[derive(Clone, Debug)]
pub struct BonusDropChance {
    settings: BonusDropSettings,
}

impl BonusDropChance {
    /// Creates the rule.
    #[must_use]
    pub fn new(settings: BonusDropSettings) -> Self {
        Self { settings }
    }

    /// Chance at a trait level, clamped to `[0, 1]`.
    #[must_use]
    pub fn chance_at(&self, level: u8) -> f64 {
        let extra_levels = f64::from(level.saturating_sub(1));
        clamp_chance(self.settings.base_chance + self.settings.per_level * extra_levels)
    }
}

impl EffectRule for BonusDropChance {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::BonusDrop
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        if context.trigger() == TriggerKind::Chained && !self.settings.chained {
            return false;
        }
        if !category_allowed(&self.settings.categories, context.subject().category) {
            return false;
        }
        if matches!(self.settings.effect, BonusEffect::Multiply { .. }) && context.rewards().is_empty() {
            return false;
        }
        context.tool().has(&self.settings.trait_id)
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let level = context.tool().level(&self.settings.trait_id).unwrap_or(0);
        if !context.roll(self.chance_at(level)) {
            return Ok(RuleEffect::NoEffect);
        }

        match self.settings.effect {
            BonusEffect::Multiply { factor } => context.scale_rewards(factor),
            BonusEffect::Append { item_id, quantity } => {
                if !context.add_reward(item_id, quantity) {
                    return Ok(RuleEffect::NoEffect);
                }
            }
        }
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{Interaction, PipelineOptions, Reward, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    fn settings(base_chance: f64, per_level: f64) -> BonusDropSettings {
        BonusDropSettings {
            name: "lucky".to_string(),
            priority: priority::BONUS_DROP,
            trait_id: "lucky".to_string(),
            base_chance,
            per_level,
            categories: Vec::new(),
            effect: BonusEffect::Append {
                item_id: 4,
                quantity: 1,
            },
            chained: false,
        }
    }

    fn interaction(level: u8) -> Interaction {
        Interaction::new(
            1,
            Subject::new(4, SkillCategory::Mining),
            ToolSnapshot::new(278).with_trait("lucky", level),
        )
    }

    #[test]
    fn test_chance_scales_and_clamps() {
        let rule = BonusDropChance::new(settings(0.1, 0.05));
        assert!((rule.chance_at(1) - 0.1).abs() < 1e-9);
        assert!((rule.chance_at(3) - 0.2).abs() < 1e-9);

        let rule = BonusDropChance::new(settings(-0.5, 0.0));
        assert_eq!(rule.chance_at(1), 0.0);

        let rule = BonusDropChance::new(settings(0.9, 0.5));
        assert_eq!(rule.chance_at(5), 1.0);
    }

    #[test]
    fn test_winning_roll_appends() {
        let rule = BonusDropChance::new(settings(1.0, 0.0));
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut context =
            InteractionContext::new(interaction(1), PipelineOptions::all(), [Reward::new(4, 1)], &mut rng);

        assert!(rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(context.rewards(), &[Reward::new(4, 2)]);
    }

    #[test]
    fn test_losing_roll_changes_nothing() {
        let rule = BonusDropChance::new(settings(0.5, 0.0));
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut context =
            InteractionContext::new(interaction(1), PipelineOptions::all(), [Reward::new(4, 1)], &mut rng);

        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::NoEffect));
        assert_eq!(context.total_quantity(), 1);
    }

    #[test]
    fn test_multiply_effect() {
        let rule = BonusDropChance::new(BonusDropSettings {
            effect: BonusEffect::Multiply { factor: 2.0 },
            ..settings(1.0, 0.0)
        });
        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction(1), PipelineOptions::all(), [Reward::new(4, 3)], &mut rng);
        rule.apply(&mut context).unwrap();
        assert_eq!(context.rewards(), &[Reward::new(4, 6)]);
    }

    #[test]
    fn test_chained_triggers_need_opt_in() {
        let mut rng = StepRng::new(0, 0);
        let context = InteractionContext::new(
            interaction(1).chained(),
            PipelineOptions::all(),
            [Reward::new(4, 1)],
            &mut rng,
        );
        assert!(!BonusDropChance::new(settings(1.0, 0.0)).applies(&context));

        let opted_in = BonusDropChance::new(BonusDropSettings {
            chained: true,
            ..settings(1.0, 0.0)
        });
        assert!(opted_in.applies(&context));
    }

    #[test]
    fn test_missing_trait_is_skipped() {
        let rule = BonusDropChance::new(settings(1.0, 0.0));
        let mut rng = StepRng::new(0, 0);
        let interaction = Interaction::new(1, Subject::new(4, SkillCategory::Mining), ToolSnapshot::new(278));
        let context =
            InteractionContext::new(interaction, PipelineOptions::all(), [Reward::new(4, 1)], &mut rng);
        assert!(!rule.applies(&context));
    }
}
