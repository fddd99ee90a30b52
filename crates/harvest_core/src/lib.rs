//! # HARVEST Core
//!
//! The effect pipeline kernel: what happens when a player breaks, harvests or
//! fishes something is decided by an ordered chain of small rules, each
//! reading and mutating a shared [`InteractionContext`].
//!
//! ## Design Principles
//!
//! 1. **Ordered policy** - rules run by ascending priority, ties keep
//!    registration order, and the engine validates the order once at build
//! 2. **Fault isolation** - a rule that errors or panics is rolled back and
//!    the run continues with the next rule
//! 3. **Single randomness source** - every roll goes through the engine's
//!    seedable source, so runs are reproducible
//! 4. **No policy in the kernel** - concrete rules live in `harvest_economy`
//!
//! ## Example
//!
//! ```rust,ignore
//! use harvest_core::{Interaction, PipelineEngine, PipelineOptions, SkillCategory, Subject, ToolSnapshot};
//!
//! let mut builder = PipelineEngine::builder();
//! builder.base_yield(drop_table).seed(42).register(my_rule);
//! let engine = builder.build()?;
//!
//! let interaction = Interaction::new(
//!     player_id,
//!     Subject::new(block_id, SkillCategory::Mining),
//!     ToolSnapshot::new(pickaxe_id).with_trait("yield_boost", 2),
//! );
//! if let Some(result) = engine.process(&interaction, &PipelineOptions::all()) {
//!     // result.rewards, result.experience, result.routing ...
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod amount;
pub mod context;
pub mod dice;
pub mod engine;
pub mod error;
pub mod options;
pub mod result;
pub mod rule;
pub mod signals;
pub mod tool;
pub mod types;

pub use amount::Amount;
pub use context::InteractionContext;
pub use dice::{clamp_chance, Dice, MAX_ROLLED_TRIALS};
pub use engine::{BaseYield, PipelineBuilder, PipelineEngine};
pub use error::{HarvestResult, PipelineError, RuleFault, RuleOutcome};
pub use options::{
    FlagSource, PipelineFlags, PipelineOptions, RuleCategories, RuleCategory, RuleRole, SharedFlags,
};
pub use result::{DeliveryReport, PipelineResult, RuleDiagnostic, TraceStatus};
pub use rule::{priority, EffectRule, RuleEffect};
pub use signals::Signals;
pub use tool::ToolSnapshot;
pub use types::{
    ActorId, BlockId, BlockPos, Interaction, ItemId, Rarity, Reward, SkillCategory, Subject,
    TriggerKind,
};
