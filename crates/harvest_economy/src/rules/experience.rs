//! # Experience Grant
//!
//! Grants experience in the subject's category from the *final* reward
//! quantities. It must run after every reward-modifying rule; the engine
//! builder rejects any ordering where it would not.

use std::collections::HashMap;

use harvest_core::{
    priority, EffectRule, InteractionContext, ItemId, RuleCategory, RuleEffect, RuleOutcome,
};
use serde::{Deserialize, Serialize};

/// Experience override for one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemExperience {
    /// Item.
    pub item_id: ItemId,
    /// Experience per unit.
    pub per_unit: u64,
}

/// Experience configuration (`[experience]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceSettings {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i32,
    /// Experience per unit for items without an override.
    pub per_unit: u64,
    /// Per-item overrides.
    pub overrides: Vec<ItemExperience>,
}

impl Default for ExperienceSettings {
    fn default() -> Self {
        Self {
            name: "experience".to_string(),
            priority: priority::EXPERIENCE,
            per_unit: 5,
            overrides: Vec::new(),
        }
    }
}

/// `per_unit x quantity`, summed over the final rewards.
#[derive(Clone, Debug)]
pub struct ExperienceGrant {
    settings: ExperienceSettings,
    overrides: HashMap<ItemId, u64>,
}

impl ExperienceGrant {
    /// Creates the rule.
    #[must_use]
    pub fn new(settings: ExperienceSettings) -> Self {
        let overrides = settings
            .overrides
            .iter()
            .map(|item| (item.item_id, item.per_unit))
            .collect();
        Self {
            settings,
            overrides,
        }
    }
}

impl EffectRule for ExperienceGrant {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Experience
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        !context.rewards().is_empty()
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let amount = context.rewards().iter().fold(0u64, |total, reward| {
            let per_unit = self
                .overrides
                .get(&reward.item_id)
                .copied()
                .unwrap_or(self.settings.per_unit);
            total.saturating_add(per_unit.saturating_mul(u64::from(reward.quantity)))
        });
        if amount == 0 {
            return Ok(RuleEffect::NoEffect);
        }
        let category = context.subject().category;
        context.add_experience(category, amount);
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{Interaction, PipelineOptions, Reward, SkillCategory, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_per_unit_with_overrides() {
        let rule = ExperienceGrant::new(ExperienceSettings {
            per_unit: 5,
            overrides: vec![ItemExperience {
                item_id: 264,
                per_unit: 50,
            }],
            ..ExperienceSettings::default()
        });
        let interaction = Interaction::new(1, Subject::new(56, SkillCategory::Mining), ToolSnapshot::new(1));
        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction,
            PipelineOptions::all(),
            [Reward::new(4, 2), Reward::new(264, 1)],
            &mut rng,
        );
        context.add_experience(SkillCategory::Mining, 1);

        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(context.experience_for(SkillCategory::Mining), 61);
    }

    #[test]
    fn test_zero_rate_grants_nothing() {
        let rule = ExperienceGrant::new(ExperienceSettings {
            per_unit: 0,
            ..ExperienceSettings::default()
        });
        let interaction = Interaction::new(1, Subject::new(2, SkillCategory::Excavation), ToolSnapshot::new(1));
        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction, PipelineOptions::all(), [Reward::new(3, 4)], &mut rng);
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::NoEffect));
        assert!(context.experience().is_empty());
    }
}
