//! # Pipeline Error Types
//!
//! Two families of errors exist:
//!
//! - [`PipelineError`]: setup-time problems (builder validation, config).
//!   These are returned to the operator and stop the engine from being built.
//! - [`RuleFault`]: a rule failed while applying. These never leave
//!   [`crate::PipelineEngine::process`]; the engine rolls the context back,
//!   logs the fault and continues with the next rule.

use thiserror::Error;

use crate::rule::RuleEffect;

/// Errors that can occur while assembling or configuring a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Two rules were registered under the same name.
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    /// `unregister` named a rule that is not registered.
    #[error("rule not registered: {0}")]
    UnknownRule(String),

    /// More than one terminal rule was registered.
    #[error("only one terminal rule may be registered, found {first} and {second}")]
    MultipleTerminalRules {
        /// Name of the first terminal rule.
        first: String,
        /// Name of the second terminal rule.
        second: String,
    },

    /// The terminal rule does not run strictly last.
    #[error("terminal rule {terminal} (priority {terminal_priority}) must run after {other} (priority {other_priority})")]
    TerminalNotLast {
        /// Name of the terminal rule.
        terminal: String,
        /// Its priority.
        terminal_priority: i32,
        /// A rule that would run at or after it.
        other: String,
        /// That rule's priority.
        other_priority: i32,
    },

    /// A valuation rule (experience, currency) would observe rewards before
    /// every modifier ran.
    #[error("valuation rule {valuation} (priority {valuation_priority}) must run after reward rule {reward} (priority {reward_priority})")]
    ValuationOutOfOrder {
        /// Name of the valuation rule.
        valuation: String,
        /// Its priority.
        valuation_priority: i32,
        /// The reward-modifying rule that runs too late.
        reward: String,
        /// That rule's priority.
        reward_priority: i32,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration {path}: {reason}")]
    ConfigIo {
        /// The path that was read.
        path: String,
        /// The underlying I/O error message.
        reason: String,
    },
}

/// Result type for pipeline setup operations.
pub type HarvestResult<T> = Result<T, PipelineError>;

/// A failure raised by a rule while applying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleFault {
    /// The rule found a configuration it cannot act on.
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// An external collaborator (inventory, progression) refused the request.
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    /// The rule detected a broken invariant in the context.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The rule panicked; the payload message is preserved when available.
    #[error("panicked: {0}")]
    Panicked(String),
}

/// Outcome of a single `apply` call.
pub type RuleOutcome = Result<RuleEffect, RuleFault>;
