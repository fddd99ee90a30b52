//! # Tool Snapshots
//!
//! The pipeline never sees the live tool object. The host copies the tool's
//! item id and traits into a [`ToolSnapshot`] when the interaction happens,
//! so anything that mutates the real tool mid-run (durability loss, charge
//! consumption, a plugin stripping a trait) cannot change a decision the
//! pipeline already made.

use std::collections::BTreeMap;

use crate::types::ItemId;

/// Owned copy of a tool and its traits.
///
/// Traits are keyed by string id (`"yield_boost"`, `"direct_pickup"`) and
/// carry a level starting at 1. A level of 0 is never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolSnapshot {
    /// Item type of the tool, 0 for bare hands.
    pub item_id: ItemId,
    traits: BTreeMap<String, u8>,
}

impl ToolSnapshot {
    /// Snapshot of bare hands.
    #[must_use]
    pub fn bare_hands() -> Self {
        Self::default()
    }

    /// Snapshot of a tool without traits.
    #[must_use]
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            traits: BTreeMap::new(),
        }
    }

    /// Adds a trait at `level`. Level 0 removes the trait.
    #[must_use]
    pub fn with_trait(mut self, id: impl Into<String>, level: u8) -> Self {
        self.set_trait(id, level);
        self
    }

    /// Sets a trait level in place. Level 0 removes the trait.
    pub fn set_trait(&mut self, id: impl Into<String>, level: u8) {
        let id = id.into();
        if level == 0 {
            self.traits.remove(&id);
        } else {
            self.traits.insert(id, level);
        }
    }

    /// Level of a trait, if present.
    #[inline]
    #[must_use]
    pub fn level(&self, id: &str) -> Option<u8> {
        self.traits.get(id).copied()
    }

    /// Returns true if the trait is present at any level.
    #[inline]
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.traits.contains_key(id)
    }

    /// Iterates traits in id order.
    pub fn traits(&self) -> impl Iterator<Item = (&str, u8)> {
        self.traits.iter().map(|(id, level)| (id.as_str(), *level))
    }
}
