//! # Pipeline Results
//!
//! Immutable snapshot of a finished run, handed to the host. The engine keeps
//! no reference to it.

use std::collections::BTreeMap;

use crate::amount::Amount;
use crate::error::RuleFault;
use crate::types::{ItemId, Reward, SkillCategory};

/// Where delivery routed the rewards, plus the signals the host must act on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Units placed directly into the actor's holding space.
    pub given_to_actor: Vec<Reward>,
    /// Units the host must spawn in the world at the subject's position.
    pub placed_in_world: Vec<Reward>,
    /// Job payout to credit to the actor.
    pub currency: Option<Amount>,
    /// The host should replant the subject instead of leaving air.
    pub replant: bool,
    /// Consumable charges the host should deduct from the live tool.
    pub charges_spent: u32,
}

impl DeliveryReport {
    /// Total units given to the actor.
    #[must_use]
    pub fn given_units(&self) -> u64 {
        self.given_to_actor.iter().map(|r| u64::from(r.quantity)).sum()
    }

    /// Total units placed in the world.
    #[must_use]
    pub fn world_units(&self) -> u64 {
        self.placed_in_world.iter().map(|r| u64::from(r.quantity)).sum()
    }
}

/// How a rule fared in one run, recorded when it failed or when the debug
/// flag was set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceStatus {
    /// `applies` returned true and `apply` succeeded.
    Applied,
    /// `applies` returned false.
    NotApplicable,
    /// `apply` succeeded without changing anything.
    NoEffect,
    /// The rule's category was disabled by the options.
    Disabled,
    /// `apply` failed; the context was rolled back.
    Failed(RuleFault),
}

/// One diagnostic entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDiagnostic {
    /// Rule name.
    pub rule: String,
    /// Rule priority.
    pub priority: i32,
    /// What happened.
    pub status: TraceStatus,
    /// Total reward units before the rule ran.
    pub units_before: u64,
    /// Total reward units after the rule ran (or after rollback).
    pub units_after: u64,
}

impl RuleDiagnostic {
    /// Returns true when the rule failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, TraceStatus::Failed(_))
    }
}

/// Final state of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineResult {
    /// Final reward lines.
    pub rewards: Vec<Reward>,
    /// Experience per category.
    pub experience: BTreeMap<SkillCategory, u64>,
    /// Rules that fired, in application order.
    pub applied: Vec<String>,
    /// Rewards were handed out by the pipeline.
    pub delivered: bool,
    /// The subject was consumed by the pipeline; the host need not remove it.
    pub subject_consumed: bool,
    /// Routing and host actions recorded by delivery.
    pub routing: DeliveryReport,
    /// Failures always; per-rule traces when debugging.
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl PipelineResult {
    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.rewards.iter().map(|r| u64::from(r.quantity)).sum()
    }

    /// Units of one item kind.
    #[must_use]
    pub fn quantity_of(&self, item_id: ItemId) -> u64 {
        self.rewards
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| u64::from(r.quantity))
            .sum()
    }

    /// Experience for one category.
    #[must_use]
    pub fn experience_for(&self, category: SkillCategory) -> u64 {
        self.experience.get(&category).copied().unwrap_or(0)
    }

    /// Whether a rule fired.
    #[must_use]
    pub fn was_applied(&self, rule: &str) -> bool {
        self.applied.iter().any(|name| name == rule)
    }

    /// Failure diagnostics only.
    pub fn failures(&self) -> impl Iterator<Item = &RuleDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_failure())
    }
}
