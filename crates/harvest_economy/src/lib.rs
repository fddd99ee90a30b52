//! # HARVEST Economy
//!
//! Game-balance policy for the HARVEST effect pipeline: the stock rules,
//! the collaborators they consult, drop tables and TOML configuration.
//!
//! ## Design Principles
//!
//! 1. **Config-bound rules** - every rule is built from a settings struct
//!    loaded once at startup and keeps no per-run state
//! 2. **Clamp, don't crash** - out-of-range chances are clamped with a warning
//! 3. **Final quantities** - currency and experience read rewards after every
//!    modifier has run
//! 4. **Single delivery** - exactly one terminal rule hands rewards out
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use harvest_economy::{InventoryLedger, PipelineConfig, ProgressionBook, Services};
//!
//! let config = PipelineConfig::from_file("crates/harvest_economy/data/pipeline.toml")?;
//! let ledger = Arc::new(InventoryLedger::new());
//! let services = Services::new(Arc::new(ProgressionBook::new()), ledger.clone());
//! let flags = config.shared_flags();
//! let engine = config.build_engine(&services, &flags)?;
//!
//! if let Some(result) = engine.process(&interaction, &PipelineOptions::all()) {
//!     spawn_in_world(&result.routing.placed_in_world);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod drops;
pub mod error;
pub mod inventory;
pub mod rules;
pub mod services;

pub use config::{FlagSettings, PipelineConfig};
pub use drops::{DropEntry, DropTable};
pub use error::{EconomyError, EconomyResult};
pub use inventory::{Inventory, InventoryLedger, InventorySnapshot};
pub use rules::{
    BonusDropChance, ConsumableEffect, CurrencyBonus, Delivery, ExperienceGrant, Replant,
    TierBonus, TierTieBreak, YieldMultiplier,
};
pub use services::{HoldingSpace, Progression, ProgressionBook, Services};
