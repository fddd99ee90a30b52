//! # Economy Error Types
//!
//! Errors raised by the reference collaborators (inventory ledger,
//! progression book). Pipeline setup errors live in `harvest_core`.

use harvest_core::ActorId;
use thiserror::Error;

/// Errors that can occur in the economy collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Inventory is full, cannot add more items.
    #[error("inventory full: capacity {capacity}, could not fit {amount}")]
    InventoryFull {
        /// Slot capacity.
        capacity: u32,
        /// Amount that did not fit.
        amount: u32,
    },

    /// The actor has no open inventory (offline, unknown).
    #[error("no inventory open for actor {0}")]
    UnknownActor(ActorId),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
