//! # Replant
//!
//! A farming tool with the replant trait takes one seed out of the harvest
//! and asks the host to put the crop back instead of leaving air.

use std::collections::HashMap;

use harvest_core::{
    priority, BlockId, EffectRule, InteractionContext, ItemId, Reward, RuleCategory, RuleEffect,
    RuleOutcome, SkillCategory,
};
use serde::{Deserialize, Serialize};

/// The seed a crop is replanted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMapping {
    /// Crop block.
    pub block_id: BlockId,
    /// Seed item taken from the rewards.
    pub seed_item: ItemId,
}

/// Replant configuration (`[replant]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplantSettings {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i32,
    /// Tool trait that enables replanting.
    pub trait_id: String,
    /// Seeds per crop.
    pub seeds: Vec<SeedMapping>,
}

impl Default for ReplantSettings {
    fn default() -> Self {
        Self {
            name: "replant".to_string(),
            priority: priority::REPLANT,
            trait_id: "replant".to_string(),
            seeds: Vec::new(),
        }
    }
}

/// Takes a seed and requests a replant.
#[derive(Clone, Debug)]
pub struct Replant {
    settings: ReplantSettings,
    seeds: HashMap<BlockId, ItemId>,
}

impl Replant {
    /// Creates the rule.
    #[must_use]
    pub fn new(settings: ReplantSettings) -> Self {
        let seeds = settings
            .seeds
            .iter()
            .map(|mapping| (mapping.block_id, mapping.seed_item))
            .collect();
        Self { settings, seeds }
    }

    fn seed_for(&self, context: &InteractionContext<'_>) -> Option<ItemId> {
        self.seeds.get(&context.subject().block_id).copied()
    }
}

impl EffectRule for Replant {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Replant
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        context.subject().category == SkillCategory::Farming
            && context.tool().has(&self.settings.trait_id)
            && self
                .seed_for(context)
                .is_some_and(|seed| context.quantity_of(seed) > 0)
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let Some(seed) = self.seed_for(context) else {
            return Ok(RuleEffect::NoEffect);
        };
        if context.quantity_of(seed) == 0 {
            return Ok(RuleEffect::NoEffect);
        }

        context.transform_rewards(|reward, _| {
            if reward.item_id == seed {
                Reward::new(seed, reward.quantity - 1)
            } else {
                reward
            }
        });
        context.signals_mut().request_replant();
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{Interaction, PipelineOptions, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    const WHEAT_CROP: BlockId = 59;
    const WHEAT: ItemId = 296;
    const SEEDS: ItemId = 295;

    fn rule() -> Replant {
        Replant::new(ReplantSettings {
            seeds: vec![SeedMapping {
                block_id: WHEAT_CROP,
                seed_item: SEEDS,
            }],
            ..ReplantSettings::default()
        })
    }

    fn interaction() -> Interaction {
        Interaction::new(
            1,
            Subject::new(WHEAT_CROP, SkillCategory::Farming),
            ToolSnapshot::new(292).with_trait("replant", 1),
        )
    }

    #[test]
    fn test_takes_one_seed() {
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(),
            PipelineOptions::all(),
            [Reward::new(WHEAT, 1), Reward::new(SEEDS, 2)],
            &mut rng,
        );
        let rule = rule();
        assert!(rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(context.rewards(), &[Reward::new(WHEAT, 1), Reward::new(SEEDS, 1)]);
        assert!(context.signals().replant_requested());
    }

    #[test]
    fn test_last_seed_line_is_dropped() {
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(),
            PipelineOptions::all(),
            [Reward::new(WHEAT, 1), Reward::new(SEEDS, 1)],
            &mut rng,
        );
        rule().apply(&mut context).unwrap();
        assert_eq!(context.rewards(), &[Reward::new(WHEAT, 1)]);
    }

    #[test]
    fn test_no_seed_no_replant() {
        let mut rng = StepRng::new(0, 0);
        let context =
            InteractionContext::new(interaction(), PipelineOptions::all(), [Reward::new(WHEAT, 1)], &mut rng);
        assert!(!rule().applies(&context));
    }
}
