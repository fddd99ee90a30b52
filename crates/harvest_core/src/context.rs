//! # Interaction Context
//!
//! The per-run working state every rule reads and mutates.
//!
//! ## Invariants
//!
//! 1. **Positive rewards** - every stored reward line has quantity >= 1.
//!    Zero lines are dropped on the way in, never stored.
//! 2. **Monotonic experience** - no operation lowers a category's total.
//! 3. **Write-once markers** - a rule name is marked applied at most once.
//! 4. **Monotonic terminal flags** - `delivered` and `subject_consumed`
//!    go false -> true and stay there, even across a rollback.
//! 5. **Atomic mutations** - `scale_rewards` and `transform_rewards` compute
//!    the new list from a snapshot and swap it in, so a rule never observes
//!    its own half-finished rewrite.

use std::collections::BTreeMap;

use rand::RngCore;

use crate::dice::Dice;
use crate::options::PipelineOptions;
use crate::result::{DeliveryReport, PipelineResult, RuleDiagnostic};
use crate::signals::Signals;
use crate::tool::ToolSnapshot;
use crate::types::{ActorId, BlockPos, Interaction, ItemId, Reward, SkillCategory, Subject, TriggerKind};

/// Mutable working state for one pipeline run.
///
/// Created by the engine, owned exclusively by one `process` call and
/// consumed into a [`PipelineResult`] when the chain completes.
pub struct InteractionContext<'run> {
    interaction: Interaction,
    options: PipelineOptions,
    rewards: Vec<Reward>,
    experience: BTreeMap<SkillCategory, u64>,
    applied: Vec<String>,
    signals: Signals,
    delivered: bool,
    subject_consumed: bool,
    routing: DeliveryReport,
    rng: &'run mut dyn RngCore,
}

/// Saved mutable state, restored when a rule fails mid-apply.
pub(crate) struct Checkpoint {
    rewards: Vec<Reward>,
    experience: BTreeMap<SkillCategory, u64>,
    signals: Signals,
    routing: DeliveryReport,
    applied_len: usize,
}

impl<'run> InteractionContext<'run> {
    /// Creates a context seeded with `base_rewards`.
    ///
    /// The interaction (and with it the tool snapshot) is owned by the
    /// context; lines with zero quantity are dropped.
    pub fn new(
        interaction: Interaction,
        options: PipelineOptions,
        base_rewards: impl IntoIterator<Item = Reward>,
        rng: &'run mut dyn RngCore,
    ) -> Self {
        let mut context = Self {
            interaction,
            options,
            rewards: Vec::new(),
            experience: BTreeMap::new(),
            applied: Vec::new(),
            signals: Signals::default(),
            delivered: false,
            subject_consumed: false,
            routing: DeliveryReport::default(),
            rng,
        };
        for reward in base_rewards {
            context.add_reward(reward.item_id, reward.quantity);
        }
        context
    }

    // ========================================================================
    // Immutable interaction data
    // ========================================================================

    /// The acting player.
    #[inline]
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.interaction.actor
    }

    /// What was interacted with.
    #[inline]
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.interaction.subject
    }

    /// The context's own copy of the tool.
    #[inline]
    #[must_use]
    pub fn tool(&self) -> &ToolSnapshot {
        &self.interaction.tool
    }

    /// Direct or chained.
    #[inline]
    #[must_use]
    pub fn trigger(&self) -> TriggerKind {
        self.interaction.trigger
    }

    /// World position of the subject.
    #[inline]
    #[must_use]
    pub fn position(&self) -> BlockPos {
        self.interaction.position
    }

    /// The full interaction.
    #[inline]
    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Options for this run.
    #[inline]
    #[must_use]
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    // ========================================================================
    // Rewards
    // ========================================================================

    /// Current reward lines, in order.
    #[inline]
    #[must_use]
    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.rewards.iter().map(|r| u64::from(r.quantity)).sum()
    }

    /// Units of a single item kind.
    #[must_use]
    pub fn quantity_of(&self, item_id: ItemId) -> u32 {
        self.rewards
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| r.quantity)
            .fold(0u32, u32::saturating_add)
    }

    /// Adds units of an item. Merges into an existing line of the same kind,
    /// otherwise appends. Returns false (and stores nothing) for zero.
    pub fn add_reward(&mut self, item_id: ItemId, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.rewards.iter_mut().find(|r| r.item_id == item_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.rewards.push(Reward::new(item_id, quantity)),
        }
        true
    }

    /// Multiplies every line by `factor`, rounding up and flooring at 1.
    ///
    /// Non-finite factors are ignored. A factor <= 0 leaves every line at 1.
    pub fn scale_rewards(&mut self, factor: f64) {
        if !factor.is_finite() {
            return;
        }
        let snapshot = self.rewards.clone();
        self.rewards = snapshot
            .into_iter()
            .map(|reward| Reward::new(reward.item_id, scale_quantity(reward.quantity, factor)))
            .collect();
    }

    /// Rewrites every line through `map`, dropping lines that come back with
    /// quantity 0. `map` sees the lines as they were before the call and may
    /// roll dice.
    pub fn transform_rewards<F>(&mut self, mut map: F)
    where
        F: FnMut(Reward, &mut Dice<'_>) -> Reward,
    {
        let snapshot = self.rewards.clone();
        let mut dice = Dice::new(&mut *self.rng);
        let mapped: Vec<Reward> = snapshot
            .into_iter()
            .map(|reward| map(reward, &mut dice))
            .collect();

        // Re-insert through add_reward so a conversion that produces an
        // existing kind merges instead of duplicating the line.
        self.rewards.clear();
        for reward in mapped {
            self.add_reward(reward.item_id, reward.quantity);
        }
    }

    // ========================================================================
    // Experience
    // ========================================================================

    /// Adds experience to a category. Saturates, never decreases.
    pub fn add_experience(&mut self, category: SkillCategory, amount: u64) {
        if amount == 0 {
            return;
        }
        let total = self.experience.entry(category).or_insert(0);
        *total = total.saturating_add(amount);
    }

    /// Experience accumulated for a category so far.
    #[must_use]
    pub fn experience_for(&self, category: SkillCategory) -> u64 {
        self.experience.get(&category).copied().unwrap_or(0)
    }

    /// All experience accumulated so far.
    #[inline]
    #[must_use]
    pub fn experience(&self) -> &BTreeMap<SkillCategory, u64> {
        &self.experience
    }

    // ========================================================================
    // Applied markers
    // ========================================================================

    /// Marks a rule as applied. Returns false if it already was.
    pub fn mark_applied(&mut self, name: &str) -> bool {
        if self.is_applied(name) {
            return false;
        }
        self.applied.push(name.to_string());
        true
    }

    /// Whether a rule has been marked applied in this run.
    #[must_use]
    pub fn is_applied(&self, name: &str) -> bool {
        self.applied.iter().any(|applied| applied == name)
    }

    /// Names of applied rules, in application order.
    #[inline]
    #[must_use]
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    // ========================================================================
    // Signals, dice and terminal state
    // ========================================================================

    /// Cross-rule signals.
    #[inline]
    #[must_use]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Mutable cross-rule signals.
    #[inline]
    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    /// The run's randomness.
    #[inline]
    pub fn dice(&mut self) -> Dice<'_> {
        Dice::new(&mut *self.rng)
    }

    /// Rolls once against `chance`. See [`Dice::roll`].
    pub fn roll(&mut self, chance: f64) -> bool {
        self.dice().roll(chance)
    }

    /// Marks the rewards as delivered. Cannot be undone.
    pub fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    /// Whether rewards were delivered.
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Marks the subject as consumed (removed from the world). Cannot be
    /// undone.
    pub fn mark_consumed(&mut self) {
        self.subject_consumed = true;
    }

    /// Whether the subject was consumed.
    #[inline]
    #[must_use]
    pub fn is_subject_consumed(&self) -> bool {
        self.subject_consumed
    }

    /// Records where delivery routed the rewards.
    pub fn set_routing(&mut self, routing: DeliveryReport) {
        self.routing = routing;
    }

    /// Routing recorded so far.
    #[inline]
    #[must_use]
    pub fn routing(&self) -> &DeliveryReport {
        &self.routing
    }

    // ========================================================================
    // Engine-only
    // ========================================================================

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            rewards: self.rewards.clone(),
            experience: self.experience.clone(),
            signals: self.signals.clone(),
            routing: self.routing.clone(),
            applied_len: self.applied.len(),
        }
    }

    /// Restores rewards, experience, signals, routing and the applied list.
    /// Terminal flags are left alone: once set they stay set.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.rewards = checkpoint.rewards;
        self.experience = checkpoint.experience;
        self.signals = checkpoint.signals;
        self.routing = checkpoint.routing;
        self.applied.truncate(checkpoint.applied_len);
    }

    pub(crate) fn into_result(self, diagnostics: Vec<RuleDiagnostic>) -> PipelineResult {
        PipelineResult {
            rewards: self.rewards,
            experience: self.experience,
            applied: self.applied,
            delivered: self.delivered,
            subject_consumed: self.subject_consumed,
            routing: self.routing,
            diagnostics,
        }
    }
}

/// `ceil(quantity * factor)`, floored at 1 and capped at `u32::MAX`.
fn scale_quantity(quantity: u32, factor: f64) -> u32 {
    let scaled = (f64::from(quantity) * factor).ceil();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else if scaled < 1.0 {
        1
    } else {
        scaled as u32
    }
}
