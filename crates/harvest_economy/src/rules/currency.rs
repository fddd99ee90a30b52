//! # Currency Bonus
//!
//! Job payouts. An actor who holds the subject's category is paid per unit of
//! the final rewards, plus a tier bonus in basis points. The payout is left in
//! the `pending_currency` signal; delivery hands it to the host.

use std::collections::HashMap;
use std::sync::Arc;

use harvest_core::{
    priority, Amount, EffectRule, InteractionContext, ItemId, Reward, RuleCategory, RuleEffect,
    RuleOutcome, SkillCategory,
};
use serde::{Deserialize, Serialize};

use super::category_allowed;
use crate::services::Progression;

/// Payout override for one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayout {
    /// Item paid for.
    pub item_id: ItemId,
    /// Payout per unit.
    pub per_unit: Amount,
}

/// Currency configuration (`[currency]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i32,
    /// Payout per unit for items without an override.
    pub default_per_unit: Amount,
    /// Per-item overrides.
    pub payouts: Vec<ItemPayout>,
    /// Bonus per tier, in basis points of the base payout.
    pub tier_bonus_bp: u32,
    /// Eligible categories; empty means all.
    pub categories: Vec<SkillCategory>,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            name: "currency_bonus".to_string(),
            priority: priority::CURRENCY,
            default_per_unit: Amount::ZERO,
            payouts: Vec::new(),
            tier_bonus_bp: 100,
            categories: Vec::new(),
        }
    }
}

/// Pays job currency for final rewards.
pub struct CurrencyBonus {
    settings: CurrencySettings,
    payouts: HashMap<ItemId, Amount>,
    progression: Arc<dyn Progression>,
}

impl CurrencyBonus {
    /// Creates the rule.
    pub fn new(settings: CurrencySettings, progression: Arc<dyn Progression>) -> Self {
        let payouts = settings
            .payouts
            .iter()
            .map(|payout| (payout.item_id, payout.per_unit))
            .collect();
        Self {
            settings,
            payouts,
            progression,
        }
    }

    fn per_unit(&self, item_id: ItemId) -> Amount {
        self.payouts
            .get(&item_id)
            .copied()
            .unwrap_or(self.settings.default_per_unit)
    }

    /// Payout for a reward list at a tier.
    #[must_use]
    pub fn payout(&self, rewards: &[Reward], tier: u32) -> Amount {
        let base = rewards.iter().fold(Amount::ZERO, |total, reward| {
            total + self.per_unit(reward.item_id).saturating_mul_int(u64::from(reward.quantity))
        });
        let bonus_bp = tier.saturating_mul(self.settings.tier_bonus_bp);
        base + base.mul_percent_bp(bonus_bp)
    }
}

impl EffectRule for CurrencyBonus {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Currency
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        let category = context.subject().category;
        category_allowed(&self.settings.categories, category)
            && !context.rewards().is_empty()
            && self.progression.has_category(context.actor(), category)
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        let tier = self
            .progression
            .tier(context.actor(), context.subject().category);
        let payout = self.payout(context.rewards(), tier);
        if payout.is_zero() {
            return Ok(RuleEffect::NoEffect);
        }
        context.signals_mut().add_pending_currency(payout);
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProgressionBook;
    use harvest_core::{Interaction, PipelineOptions, Subject, ToolSnapshot};
    use rand::rngs::mock::StepRng;

    fn rule(book: &Arc<ProgressionBook>) -> CurrencyBonus {
        CurrencyBonus::new(
            CurrencySettings {
                default_per_unit: Amount::from_parts(0, 500_000),
                payouts: vec![ItemPayout {
                    item_id: 264,
                    per_unit: Amount::from_whole(10),
                }],
                tier_bonus_bp: 1_000,
                ..CurrencySettings::default()
            },
            Arc::clone(book) as Arc<dyn Progression>,
        )
    }

    #[test]
    fn test_payout_with_overrides_and_tier() {
        let book = Arc::new(ProgressionBook::new());
        let rule = rule(&book);
        let rewards = [Reward::new(4, 4), Reward::new(264, 1)];

        // 4 x 0.5 + 1 x 10 = 12, +20% at tier 2
        assert_eq!(rule.payout(&rewards, 0), Amount::from_whole(12));
        assert_eq!(rule.payout(&rewards, 2), Amount::from_parts(14, 400_000));
    }

    #[test]
    fn test_requires_category() {
        let book = Arc::new(ProgressionBook::new());
        let rule = rule(&book);
        let interaction = Interaction::new(3, Subject::new(4, SkillCategory::Mining), ToolSnapshot::new(1));
        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction, PipelineOptions::all(), [Reward::new(4, 2)], &mut rng);
        assert!(!rule.applies(&context));

        book.join(3, SkillCategory::Mining);
        assert!(rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));
        assert_eq!(
            context.signals().pending_currency(),
            Some(Amount::from_parts(1, 100_000))
        );
    }
}
