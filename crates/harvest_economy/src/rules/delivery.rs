//! # Delivery
//!
//! The terminal rule. Routes the final rewards, copies the host-facing
//! signals into the routing report, and marks the run delivered and the
//! subject consumed.
//!
//! ```text
//! bypass trait?
//!   yes ──> HoldingSpace::store ──┬─> accepted ──> given_to_actor
//!                                 └─> overflow ──> placed_in_world
//!   no  ──────────────────────────────────────────> placed_in_world
//! ```
//!
//! Delivery never fails once it starts storing: a holding space that errors
//! or panics sends the rest to the world instead, so the lines it already
//! stored stay on the report and nothing is stored twice by a rollback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use harvest_core::{
    priority, DeliveryReport, EffectRule, InteractionContext, Reward, RuleCategory, RuleEffect,
    RuleOutcome,
};
use serde::{Deserialize, Serialize};

use crate::services::HoldingSpace;

/// Delivery configuration (`[delivery]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Rule name.
    pub name: String,
    /// Rule priority; must be the highest in the pipeline.
    pub priority: i32,
    /// Tool trait that sends rewards straight to the actor.
    pub bypass_trait: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            name: "delivery".to_string(),
            priority: priority::DELIVERY,
            bypass_trait: "direct_pickup".to_string(),
        }
    }
}

/// Hands rewards to the actor or the world.
pub struct Delivery {
    settings: DeliverySettings,
    holding: Arc<dyn HoldingSpace>,
}

impl Delivery {
    /// Creates the rule.
    pub fn new(settings: DeliverySettings, holding: Arc<dyn HoldingSpace>) -> Self {
        Self { settings, holding }
    }

    fn store_directly(&self, context: &InteractionContext<'_>, report: &mut DeliveryReport) {
        let actor = context.actor();
        let mut holding_available = true;

        for reward in context.rewards() {
            let accepted = if holding_available {
                let stored = catch_unwind(AssertUnwindSafe(|| {
                    self.holding.store(actor, reward.item_id, reward.quantity)
                }));
                match stored {
                    Ok(Ok(accepted)) => accepted.min(reward.quantity),
                    Ok(Err(error)) => {
                        tracing::warn!(
                            actor,
                            item = reward.item_id,
                            %error,
                            "holding space unavailable, placing rewards in the world"
                        );
                        holding_available = false;
                        0
                    }
                    Err(_) => {
                        tracing::warn!(
                            actor,
                            item = reward.item_id,
                            "holding space panicked, placing rewards in the world"
                        );
                        holding_available = false;
                        0
                    }
                }
            } else {
                0
            };

            if accepted > 0 {
                report.given_to_actor.push(Reward::new(reward.item_id, accepted));
            }
            let overflow = reward.quantity - accepted;
            if overflow > 0 {
                report.placed_in_world.push(Reward::new(reward.item_id, overflow));
            }
        }
    }
}

impl EffectRule for Delivery {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Delivery
    }

    fn applies(&self, context: &InteractionContext<'_>) -> bool {
        !context.is_delivered()
    }

    fn apply(&self, context: &mut InteractionContext<'_>) -> RuleOutcome {
        if context.is_delivered() {
            return Ok(RuleEffect::NoEffect);
        }

        let mut report = DeliveryReport::default();
        if context.tool().has(&self.settings.bypass_trait) {
            self.store_directly(context, &mut report);
        } else {
            report.placed_in_world = context.rewards().to_vec();
        }

        let signals = context.signals();
        report.currency = signals.pending_currency();
        report.replant = signals.replant_requested();
        report.charges_spent = signals.charges_spent();

        tracing::debug!(
            actor = context.actor(),
            given = report.given_units(),
            world = report.world_units(),
            "rewards delivered"
        );

        context.set_routing(report);
        context.mark_delivered();
        context.mark_consumed();
        Ok(RuleEffect::Fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EconomyResult;
    use crate::inventory::{Inventory, InventoryLedger};
    use harvest_core::{
        Amount, Interaction, ItemId, PipelineOptions, SkillCategory, Subject, ToolSnapshot,
    };
    use rand::rngs::mock::StepRng;

    fn interaction(bypass: bool) -> Interaction {
        let tool = if bypass {
            ToolSnapshot::new(278).with_trait("direct_pickup", 1)
        } else {
            ToolSnapshot::new(278)
        };
        Interaction::new(1, Subject::new(4, SkillCategory::Mining), tool)
    }

    #[test]
    fn test_without_bypass_everything_goes_to_world() {
        let ledger = Arc::new(InventoryLedger::new());
        ledger.open(1, Inventory::default());
        let rule = Delivery::new(DeliverySettings::default(), ledger.clone());

        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction(false), PipelineOptions::all(), [Reward::new(4, 3)], &mut rng);
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));

        assert_eq!(context.routing().placed_in_world, vec![Reward::new(4, 3)]);
        assert!(context.routing().given_to_actor.is_empty());
        assert_eq!(ledger.count(1, 4), 0);
        assert!(context.is_delivered());
        assert!(context.is_subject_consumed());
    }

    #[test]
    fn test_overflow_is_placed_in_world() {
        let ledger = Arc::new(InventoryLedger::new());
        let mut inventory = Inventory::new(1, 64);
        inventory.add(4, 63).unwrap();
        ledger.open(1, inventory);
        let rule = Delivery::new(DeliverySettings::default(), ledger.clone());

        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction(true), PipelineOptions::all(), [Reward::new(4, 2)], &mut rng);
        rule.apply(&mut context).unwrap();

        assert_eq!(context.routing().given_to_actor, vec![Reward::new(4, 1)]);
        assert_eq!(context.routing().placed_in_world, vec![Reward::new(4, 1)]);
        assert_eq!(ledger.count(1, 4), 64);
    }

    #[test]
    fn test_missing_holding_space_falls_back_to_world() {
        let ledger = Arc::new(InventoryLedger::new());
        let rule = Delivery::new(DeliverySettings::default(), ledger);

        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(true),
            PipelineOptions::all(),
            [Reward::new(4, 2), Reward::new(5, 1)],
            &mut rng,
        );
        rule.apply(&mut context).unwrap();
        assert_eq!(context.routing().world_units(), 3);
        assert_eq!(context.routing().given_units(), 0);
    }

    /// Stores into a ledger, then panics on one item.
    struct BrittleHolding {
        ledger: InventoryLedger,
        breaks_on: ItemId,
    }

    impl HoldingSpace for BrittleHolding {
        fn store(&self, actor: u64, item_id: ItemId, quantity: u32) -> EconomyResult<u32> {
            if item_id == self.breaks_on {
                panic!("storage backend lost");
            }
            self.ledger.store(actor, item_id, quantity)
        }
    }

    #[test]
    fn test_panicking_holding_space_keeps_stored_lines() {
        let ledger = InventoryLedger::new();
        ledger.open(1, Inventory::default());
        let holding = Arc::new(BrittleHolding { ledger, breaks_on: 5 });
        let rule = Delivery::new(DeliverySettings::default(), holding.clone());

        let mut rng = StepRng::new(0, 0);
        let mut context = InteractionContext::new(
            interaction(true),
            PipelineOptions::all(),
            [Reward::new(4, 3), Reward::new(5, 2), Reward::new(6, 1)],
            &mut rng,
        );
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::Fired));

        assert!(context.is_delivered());
        assert_eq!(holding.ledger.count(1, 4), 3);
        assert_eq!(context.routing().given_to_actor, vec![Reward::new(4, 3)]);
        assert_eq!(
            context.routing().placed_in_world,
            vec![Reward::new(5, 2), Reward::new(6, 1)]
        );
    }

    #[test]
    fn test_signals_reach_the_report() {
        let ledger = Arc::new(InventoryLedger::new());
        let rule = Delivery::new(DeliverySettings::default(), ledger);

        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction(false), PipelineOptions::all(), [Reward::new(4, 1)], &mut rng);
        context.signals_mut().add_pending_currency(Amount::from_whole(3));
        context.signals_mut().request_replant();
        context.signals_mut().spend_charges(2);
        rule.apply(&mut context).unwrap();

        let routing = context.routing();
        assert_eq!(routing.currency, Some(Amount::from_whole(3)));
        assert!(routing.replant);
        assert_eq!(routing.charges_spent, 2);
    }

    #[test]
    fn test_second_delivery_is_a_no_op() {
        let ledger = Arc::new(InventoryLedger::new());
        ledger.open(1, Inventory::default());
        let rule = Delivery::new(DeliverySettings::default(), ledger.clone());

        let mut rng = StepRng::new(0, 0);
        let mut context =
            InteractionContext::new(interaction(true), PipelineOptions::all(), [Reward::new(4, 2)], &mut rng);
        rule.apply(&mut context).unwrap();
        assert!(!rule.applies(&context));
        assert_eq!(rule.apply(&mut context), Ok(RuleEffect::NoEffect));

        assert_eq!(ledger.count(1, 4), 2);
        assert_eq!(context.routing().given_units(), 2);
    }
}
