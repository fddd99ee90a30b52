//! # Tier Bonus
//!
//! Rolls once per reward unit against a chance derived from the actor's
//! progression tier in the subject's category. Every success adds one unit
//! to the line that rolled it; there is no flat percentage of the batch.
//! Lines longer than [`harvest_core::MAX_ROLLED_TRIALS`] roll that many
//! units and scale the hits to the whole line.

use std::sync::Arc;

use harvest_core::{
    clamp_chance, priority, EffectRule, InteractionContext, Reward, RuleCategory, RuleEffect,
    RuleOutcome, SkillCategory,
};
use serde::{Deserialize, Serialize};

use super::category_allowed;
use crate::services::Progression;

/// Tier bonus configuration (`[tier_bonus]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBonusSettings {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i32,
    /// Per-unit chance gained per tier.
    pub per_tier: f64,
    /// Cap on the per-unit chance.
    pub max_chance: f64,
    /// Eligible categories; empty means all.
    pub categories: Vec<SkillCategory>,
}

impl Default for TierBonusSettings {
    fn default() -> Self {
        Self {
            name: "tier_bonus".to_string(),
            priority: priority::TIER_BONUS,
            per_tier: 0.01,
            max_chance: 0.5,
            categories: Vec::new(),
        }
    }
}

/// Per-unit bonus from progression tier.
pub struct TierBonus {
    settings: TierBonusSettings,
    progression: Arc<dyn Progression>,
}

impl TierBonus {
    /// Creates the rule.
    pub fn new(settings: TierBonusSettings, progression: Arc<dyn Progression>) -> Self {
        Self {
            settings,
            progression,
        }
    }

    /// Per-unit chance at a tier.
    #[must_use]
    pub fn chance_at(&self, tier: u32) -> f64 {
        let raw = f64::from(tier) * self.settings.per_tier;
        clamp_chance(raw.min(self.settings.max_chance))
    }

    fn tier_of(&self, context: &InteractionContext<'_>) -> u32 {
        self.progression
            .tier(context.actor(), context.subject().category)
    }
}

impl EffectRule for TierBonus {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::TierBonus
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        category_allowed(&self.settings.categories, context.subject().category)
            && !context.rewards().is_empty()
            && self.chance_at(self.tier_of(context)) > 0.0
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let chance = self.chance_at(self.tier_of(context));
        let before = context.total_quantity();

        context.transform_rewards(|reward, dice| {
            let extra = dice.successes(reward.quantity, chance);
            Reward::new(reward.item_id, reward.quantity.saturating_add(extra))
        });

        if context.total_quantity() == before {
            return Ok(RuleEffect::NoEffect);
        }
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProgressionBook;
    use harvest_core::{Interaction, PipelineOptions, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    fn rule(book: &Arc<ProgressionBook>) -> TierBonus {
        TierBonus::new(
            TierBonusSettings {
                per_tier: 0.1,
                max_chance: 0.5,
                ..TierBonusSettings::default()
            },
            Arc::clone(book) as Arc<dyn Progression>,
        )
    }

    fn interaction() -> Interaction {
        Interaction::new(1, Subject::new(4, SkillCategory::Mining), ToolSnapshot::new(278))
    }

    #[test]
    fn test_chance_caps_at_max() {
        let book = Arc::new(ProgressionBook::new());
        let rule = rule(&book);
        assert!((rule.chance_at(3) - 0.3).abs() < 1e-9);
        assert!((rule.chance_at(40) - 0.5).abs() < 1e-9);
        assert_eq!(rule.chance_at(0), 0.0);
    }

    #[test]
    fn test_every_unit_rolls() {
        let book = Arc::new(ProgressionBook::new());
        book.set_tier(1, SkillCategory::Mining, 2);
        let rule = rule(&book);

        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(),
            PipelineOptions::all(),
            [Reward::new(4, 3), Reward::new(7, 1)],
            &mut rng,
        );
        assert!(rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(context.rewards(), &[Reward::new(4, 6), Reward::new(7, 2)]);
    }

    #[test]
    fn test_no_tier_no_bonus() {
        let book = Arc::new(ProgressionBook::new());
        let rule = rule(&book);
        let mut rng = StepRng::new(0, 0);
        let context =
            InteractionContext::new(interaction(), PipelineOptions::all(), [Reward::new(4, 3)], &mut rng);
        assert!(!rule.applies(&context));
    }

    #[test]
    fn test_all_rolls_lost() {
        let book = Arc::new(ProgressionBook::new());
        book.set_tier(1, SkillCategory::Mining, 2);
        let rule = rule(&book);
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut context =
            InteractionContext::new(interaction(), PipelineOptions::all(), [Reward::new(4, 3)], &mut rng);
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::NoEffect));
        assert_eq!(context.total_quantity(), 3);
    }

    #[test]
    fn test_huge_line_rolls_within_budget() {
        let book = Arc::new(ProgressionBook::new());
        book.set_tier(1, SkillCategory::Mining, 5);
        let rule = rule(&book);

        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(),
            PipelineOptions::all(),
            [Reward::new(4, 3_000_000_000)],
            &mut rng,
        );
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(context.rewards(), &[Reward::new(4, u32::MAX)]);
    }
}
