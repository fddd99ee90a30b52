//! # Pipeline Engine
//!
//! **Ordered, fault-isolated rule execution**
//!
//! ```text
//! Host ──> process(interaction, options)
//!             │
//!             ├─ flags disabled? ──> None (host falls back to vanilla)
//!             │
//!             ├─ base yield ──> InteractionContext
//!             │
//!             ├─ for rule in (priority, registration order):
//!             │      category enabled? ─ applies? ─ checkpoint ─ apply
//!             │                                        │
//!             │                          Err / panic ──┴─> restore + warn!
//!             │
//!             └─ snapshot ──> PipelineResult
//! ```
//!
//! The engine is assembled once through [`PipelineBuilder`], which validates
//! ordering constraints, and is immutable afterwards. All calls are
//! synchronous; `process` must not be re-entered from inside a rule.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::context::InteractionContext;
use crate::error::{HarvestResult, PipelineError, RuleFault};
use crate::options::{FlagSource, PipelineFlags, PipelineOptions, RuleRole};
use crate::result::{PipelineResult, RuleDiagnostic, TraceStatus};
use crate::rule::{EffectRule, RuleEffect};
use crate::tool::ToolSnapshot;
use crate::types::{Interaction, Reward, Subject};

/// What a subject naturally yields before any rule runs.
///
/// Must be a pure function of the subject and the tool. Closures of the
/// right shape implement it.
pub trait BaseYield: Send + Sync {
    /// Base reward lines for the subject.
    fn base_rewards(&self, subject: &Subject, tool: &ToolSnapshot) -> Vec<Reward>;
}

impl<F> BaseYield for F
where
    F: Fn(&Subject, &ToolSnapshot) -> Vec<Reward> + Send + Sync,
{
    fn base_rewards(&self, subject: &Subject, tool: &ToolSnapshot) -> Vec<Reward> {
        self(subject, tool)
    }
}

/// Base yield used when the host registers none.
struct NoBaseYield;

impl BaseYield for NoBaseYield {
    fn base_rewards(&self, _subject: &Subject, _tool: &ToolSnapshot) -> Vec<Reward> {
        Vec::new()
    }
}

/// A rule plus the order it was registered in.
struct Registered {
    rule: Box<dyn EffectRule>,
    order: usize,
}

/// Setup-phase assembly of a [`PipelineEngine`].
///
/// ```rust,ignore
/// let mut builder = PipelineEngine::builder();
/// builder
///     .base_yield(drop_table)
///     .flags(shared_flags.clone())
///     .seed(42)
///     .register(YieldMultiplier::new(settings))
///     .register(Delivery::new(ledger));
/// let engine = builder.build()?;
/// ```
pub struct PipelineBuilder {
    rules: Vec<Registered>,
    next_order: usize,
    base_yield: Box<dyn BaseYield>,
    flags: Box<dyn FlagSource>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl PipelineBuilder {
    /// Creates an empty builder: no rules, no base yield, flags enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            next_order: 0,
            base_yield: Box::new(NoBaseYield),
            flags: Box::new(PipelineFlags::default()),
            rng: None,
        }
    }

    /// Registers a rule.
    pub fn register(&mut self, rule: impl EffectRule + 'static) -> &mut Self {
        self.register_boxed(Box::new(rule))
    }

    /// Registers an already boxed rule.
    pub fn register_boxed(&mut self, rule: Box<dyn EffectRule>) -> &mut Self {
        self.rules.push(Registered {
            rule,
            order: self.next_order,
        });
        self.next_order += 1;
        self
    }

    /// Removes a rule by name.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::UnknownRule` if no rule has that name.
    pub fn unregister(&mut self, name: &str) -> HarvestResult<()> {
        let before = self.rules.len();
        self.rules.retain(|registered| registered.rule.name() != name);
        if self.rules.len() == before {
            return Err(PipelineError::UnknownRule(name.to_string()));
        }
        Ok(())
    }

    /// Removes every rule.
    pub fn clear(&mut self) -> &mut Self {
        self.rules.clear();
        self
    }

    /// Sets the base-yield collaborator.
    pub fn base_yield(&mut self, base_yield: impl BaseYield + 'static) -> &mut Self {
        self.base_yield = Box::new(base_yield);
        self
    }

    /// Sets the flag source, re-read on every call.
    pub fn flags(&mut self, flags: impl FlagSource + 'static) -> &mut Self {
        self.flags = Box::new(flags);
        self
    }

    /// Seeds the engine's randomness source for reproducible runs.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.rng = Some(Box::new(ChaCha8Rng::seed_from_u64(seed)));
        self
    }

    /// Replaces the randomness source (mock sources in tests).
    pub fn random_source(&mut self, rng: impl RngCore + Send + 'static) -> &mut Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Names of the registered rules, in execution order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        let mut ordered: Vec<&Registered> = self.rules.iter().collect();
        ordered.sort_by_key(|registered| (registered.rule.priority(), registered.order));
        ordered.into_iter().map(|registered| registered.rule.name()).collect()
    }

    /// Validates the rule set and produces an immutable engine.
    ///
    /// # Errors
    ///
    /// - `DuplicateRule` if two rules share a name
    /// - `MultipleTerminalRules` if more than one delivery rule exists
    /// - `TerminalNotLast` if any rule would run at or after delivery
    /// - `ValuationOutOfOrder` if an experience/currency rule would run
    ///   before a reward-modifying rule
    pub fn build(self) -> HarvestResult<PipelineEngine> {
        let mut rules = self.rules;
        rules.sort_by_key(|registered| (registered.rule.priority(), registered.order));
        let rules: Vec<Box<dyn EffectRule>> = rules.into_iter().map(|r| r.rule).collect();

        validate(&rules)?;

        let rng = match self.rng {
            Some(rng) => rng,
            None => Box::new(ChaCha8Rng::seed_from_u64(clock_seed())),
        };

        tracing::info!(
            rules = rules.len(),
            order = ?rules.iter().map(|rule| rule.name()).collect::<Vec<_>>(),
            "pipeline engine built"
        );

        Ok(PipelineEngine {
            rules,
            base_yield: self.base_yield,
            flags: self.flags,
            rng: Mutex::new(rng),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks naming and ordering constraints on a sorted rule list.
fn validate(rules: &[Box<dyn EffectRule>]) -> HarvestResult<()> {
    let mut names = HashSet::new();
    for rule in rules {
        if !names.insert(rule.name()) {
            return Err(PipelineError::DuplicateRule(rule.name().to_string()));
        }
    }

    let terminals: Vec<&dyn EffectRule> = rules
        .iter()
        .map(AsRef::as_ref)
        .filter(|rule| rule.category().role() == RuleRole::Terminal)
        .collect();
    if let [first, second, ..] = terminals.as_slice() {
        return Err(PipelineError::MultipleTerminalRules {
            first: first.name().to_string(),
            second: second.name().to_string(),
        });
    }
    if let Some(terminal) = terminals.first() {
        if let Some(other) = rules
            .iter()
            .filter(|rule| rule.category().role() != RuleRole::Terminal)
            .find(|rule| rule.priority() >= terminal.priority())
        {
            return Err(PipelineError::TerminalNotLast {
                terminal: terminal.name().to_string(),
                terminal_priority: terminal.priority(),
                other: other.name().to_string(),
                other_priority: other.priority(),
            });
        }
    }

    let last_modifier = rules
        .iter()
        .filter(|rule| rule.category().role() == RuleRole::RewardModifier)
        .max_by_key(|rule| rule.priority());
    if let Some(modifier) = last_modifier {
        if let Some(valuation) = rules
            .iter()
            .filter(|rule| rule.category().role() == RuleRole::Valuation)
            .find(|rule| rule.priority() <= modifier.priority())
        {
            return Err(PipelineError::ValuationOutOfOrder {
                valuation: valuation.name().to_string(),
                valuation_priority: valuation.priority(),
                reward: modifier.name().to_string(),
                reward_priority: modifier.priority(),
            });
        }
    }

    Ok(())
}

/// Seed for engines built without an explicit source.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
}

/// The orchestrator.
///
/// ## Thread Safety
///
/// `PipelineEngine` is `Send + Sync`, but runs are serialized on the
/// randomness lock and the host is expected to drive it from a single
/// simulation thread.
pub struct PipelineEngine {
    rules: Vec<Box<dyn EffectRule>>,
    base_yield: Box<dyn BaseYield>,
    flags: Box<dyn FlagSource>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl PipelineEngine {
    /// Starts assembling an engine.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in execution order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Resolves one interaction.
    ///
    /// Returns `None` when the feature flag is off; nothing is computed and
    /// no collaborator is touched.
    pub fn process(
        &self,
        interaction: &Interaction,
        options: &PipelineOptions,
    ) -> Option<PipelineResult> {
        let flags = self.flags.current();
        if !flags.enabled {
            tracing::trace!(actor = interaction.actor, "pipeline disabled, skipping");
            return None;
        }
        Some(self.run(interaction, options, flags))
    }

    /// Resolves several interactions one after another.
    ///
    /// Flags are read once for the whole batch: the result has one entry per
    /// interaction, in input order, or is empty when the feature flag is off.
    /// A flag flip lands between batches, never inside one.
    pub fn process_many(
        &self,
        interactions: &[Interaction],
        options: &PipelineOptions,
    ) -> Vec<PipelineResult> {
        let flags = self.flags.current();
        if !flags.enabled {
            tracing::trace!(batch = interactions.len(), "pipeline disabled, skipping batch");
            return Vec::new();
        }
        interactions
            .iter()
            .map(|interaction| self.run(interaction, options, flags))
            .collect()
    }

    fn run(
        &self,
        interaction: &Interaction,
        options: &PipelineOptions,
        flags: PipelineFlags,
    ) -> PipelineResult {
        let base = self
            .base_yield
            .base_rewards(&interaction.subject, &interaction.tool);

        let mut rng = self.rng.lock();
        let mut context = InteractionContext::new(interaction.clone(), *options, base, &mut **rng);
        let mut diagnostics = Vec::new();

        for rule in &self.rules {
            run_rule(rule.as_ref(), &mut context, flags.debug, &mut diagnostics);
        }

        context.into_result(diagnostics)
    }
}

/// Runs one rule inside the fault boundary.
fn run_rule(
    rule: &dyn EffectRule,
    context: &mut InteractionContext<'_>,
    debug: bool,
    diagnostics: &mut Vec<RuleDiagnostic>,
) {
    let units_before = context.total_quantity();
    let trace = |status: TraceStatus, units_after: u64| RuleDiagnostic {
        rule: rule.name().to_string(),
        priority: rule.priority(),
        status,
        units_before,
        units_after,
    };

    if !context.options().categories.allows(rule.category()) {
        if debug {
            diagnostics.push(trace(TraceStatus::Disabled, units_before));
        }
        return;
    }

    let applies = match guarded(|| rule.applies(context)) {
        Ok(applies) => applies,
        Err(fault) => {
            report_fault(rule, context, &fault);
            diagnostics.push(trace(TraceStatus::Failed(fault), units_before));
            return;
        }
    };
    if !applies {
        if debug {
            diagnostics.push(trace(TraceStatus::NotApplicable, units_before));
        }
        return;
    }

    let checkpoint = context.checkpoint();
    let outcome = guarded(|| rule.apply(context)).and_then(|outcome| outcome);

    match outcome {
        Ok(RuleEffect::NoEffect) => {
            if debug {
                diagnostics.push(trace(TraceStatus::NoEffect, context.total_quantity()));
            }
        }
        Ok(RuleEffect::Fired) => {
            context.mark_applied(rule.name());
            if debug {
                let entry = trace(TraceStatus::Applied, context.total_quantity());
                tracing::debug!(
                    rule = rule.name(),
                    priority = rule.priority(),
                    units_before = entry.units_before,
                    units_after = entry.units_after,
                    "rule applied"
                );
                diagnostics.push(entry);
            }
        }
        Err(fault) => {
            context.restore(checkpoint);
            report_fault(rule, context, &fault);
            diagnostics.push(trace(TraceStatus::Failed(fault), context.total_quantity()));
        }
    }
}

/// Calls into a rule, turning a panic into a fault.
fn guarded<T>(call: impl FnOnce() -> T) -> Result<T, RuleFault> {
    catch_unwind(AssertUnwindSafe(call)).map_err(|payload| RuleFault::Panicked(panic_message(&*payload)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn report_fault(rule: &dyn EffectRule, context: &InteractionContext<'_>, fault: &RuleFault) {
    tracing::warn!(
        rule = rule.name(),
        priority = rule.priority(),
        actor = context.actor(),
        block = context.subject().block_id,
        position = ?context.position(),
        error = %fault,
        "effect rule failed, context rolled back; continuing"
    );
}
