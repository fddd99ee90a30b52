//! # Consumable Effects
//!
//! Auto-processing carried by a consumable tool trait (auto-smelt and
//! friends). Each reward line with a mapping rolls once, not once per unit.
//! The trait level is the number of charges the tool has left; each
//! converted line spends one, and the host deducts the total from the live
//! tool after delivery.
//!
//! Protected subjects (rare or explicitly non-duplicable) clamp the chance to
//! a hard ceiling so conversions cannot be farmed for value.

use std::collections::HashMap;

use harvest_core::{
    clamp_chance, priority, EffectRule, InteractionContext, ItemId, Rarity, Reward, RuleCategory,
    RuleEffect, RuleOutcome,
};
use serde::{Deserialize, Serialize};

/// One conversion mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMapping {
    /// Item converted.
    pub from: ItemId,
    /// Item produced, unit for unit.
    pub to: ItemId,
}

/// Consumable effect configuration (`[[conversion]]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Rule name; must be unique across the pipeline.
    pub name: String,
    /// Rule priority.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Consumable trait; its level is the charges left.
    pub trait_id: String,
    /// Chance per line.
    pub chance: f64,
    /// Ceiling on the chance for protected subjects.
    #[serde(default)]
    pub protected_ceiling: f64,
    /// Conversion table.
    pub mappings: Vec<ConversionMapping>,
}

const fn default_priority() -> i32 {
    priority::CONVERSION
}

/// Converts reward kinds while the tool has charges.
#[derive(Clone, Debug)]
pub struct ConsumableEffect {
    settings: ConversionSettings,
    table: HashMap<ItemId, ItemId>,
    protected_rarity: Rarity,
}

impl ConsumableEffect {
    /// Creates the rule. Subjects at or above `protected_rarity` are
    /// protected.
    #[must_use]
    pub fn new(settings: ConversionSettings, protected_rarity: Rarity) -> Self {
        let table = settings
            .mappings
            .iter()
            .map(|mapping| (mapping.from, mapping.to))
            .collect();
        Self {
            settings,
            table,
            protected_rarity,
        }
    }

    /// Effective per-line chance for a subject.
    #[must_use]
    pub fn chance_for(&self, protected: bool) -> f64 {
        let chance = clamp_chance(self.settings.chance);
        if protected {
            chance.min(clamp_chance(self.settings.protected_ceiling))
        } else {
            chance
        }
    }

    /// The item a reward converts to.
    #[must_use]
    pub fn converts_to(&self, item_id: ItemId) -> Option<ItemId> {
        self.table.get(&item_id).copied()
    }
}

impl EffectRule for ConsumableEffect {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Conversion
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        context.tool().has(&self.settings.trait_id)
            && context
                .rewards()
                .iter()
                .any(|reward| self.table.contains_key(&reward.item_id))
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let charges = u32::from(context.tool().level(&self.settings.trait_id).unwrap_or(0));
        let chance = self.chance_for(context.subject().is_protected(self.protected_rarity));
        let mut spent = 0u32;

        context.transform_rewards(|reward, dice| {
            let Some(to) = self.converts_to(reward.item_id) else {
                return reward;
            };
            if spent >= charges || !dice.roll(chance) {
                return reward;
            }
            spent += 1;
            Reward::new(to, reward.quantity)
        });

        if spent == 0 {
            return Ok(RuleEffect::NoEffect);
        }
        let signals = context.signals_mut();
        signals.spend_charges(spent);
        signals.record_conversions(spent);
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{Interaction, PipelineOptions, SkillCategory, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    const IRON_ORE: ItemId = 15;
    const GOLD_ORE: ItemId = 14;
    const IRON_INGOT: ItemId = 265;
    const GOLD_INGOT: ItemId = 266;

    fn rule(chance: f64) -> ConsumableEffect {
        ConsumableEffect::new(
            ConversionSettings {
                name: "auto_smelt".to_string(),
                priority: priority::CONVERSION,
                trait_id: "auto_smelt".to_string(),
                chance,
                protected_ceiling: 0.1,
                mappings: vec![
                    ConversionMapping {
                        from: IRON_ORE,
                        to: IRON_INGOT,
                    },
                    ConversionMapping {
                        from: GOLD_ORE,
                        to: GOLD_INGOT,
                    },
                ],
            },
            Rarity::Epic,
        )
    }

    fn interaction(subject: Subject, charges: u8) -> Interaction {
        Interaction::new(1, subject, ToolSnapshot::new(278).with_trait("auto_smelt", charges))
    }

    #[test]
    fn test_converts_each_line_and_spends_charges() {
        let rule = rule(1.0);
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(Subject::new(IRON_ORE, SkillCategory::Mining), 10),
            PipelineOptions::all(),
            [Reward::new(IRON_ORE, 3), Reward::new(4, 1), Reward::new(GOLD_ORE, 2)],
            &mut rng,
        );

        assert!(rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(
            context.rewards(),
            &[Reward::new(IRON_INGOT, 3), Reward::new(4, 1), Reward::new(GOLD_INGOT, 2)]
        );
        assert_eq!(context.signals().charges_spent(), 2);
        assert_eq!(context.signals().converted_lines(), 2);
    }

    #[test]
    fn test_runs_out_of_charges() {
        let rule = rule(1.0);
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(Subject::new(IRON_ORE, SkillCategory::Mining), 1),
            PipelineOptions::all(),
            [Reward::new(IRON_ORE, 3), Reward::new(GOLD_ORE, 2)],
            &mut rng,
        );
        rule.apply(&mut context).unwrap();
        assert_eq!(
            context.rewards(),
            &[Reward::new(IRON_INGOT, 3), Reward::new(GOLD_ORE, 2)]
        );
        assert_eq!(context.signals().charges_spent(), 1);
    }

    #[test]
    fn test_protected_subjects_clamp_chance() {
        let rule = rule(1.0);
        assert!((rule.chance_for(true) - 0.1).abs() < 1e-9);
        assert_eq!(rule.chance_for(false), 1.0);

        // Draw of ~0.99 beats the 0.1 ceiling.
        let mut rng = StepRng::new(u64::MAX / 100 * 99, 0);
        let subject = Subject::new(GOLD_ORE, SkillCategory::Mining).non_duplicable();
        let mut context = InteractionContext::new(
            interaction(subject, 5),
            PipelineOptions::all(),
            [Reward::new(GOLD_ORE, 1)],
            &mut rng,
        );
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::NoEffect));
        assert_eq!(context.rewards(), &[Reward::new(GOLD_ORE, 1)]);

        let rare = Subject::new(GOLD_ORE, SkillCategory::Mining).with_rarity(Rarity::Legendary);
        assert!(rare.is_protected(Rarity::Epic));
    }

    #[test]
    fn test_conversion_merges_into_existing_kind() {
        let rule = rule(1.0);
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(Subject::new(IRON_ORE, SkillCategory::Mining), 5),
            PipelineOptions::all(),
            [Reward::new(IRON_INGOT, 1), Reward::new(IRON_ORE, 2)],
            &mut rng,
        );
        rule.apply(&mut context).unwrap();
        assert_eq!(context.rewards(), &[Reward::new(IRON_INGOT, 3)]);
    }
}
