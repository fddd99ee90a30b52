//! # Collaborators
//!
//! The stores rules consult but do not own. Hosts plug in their own
//! implementations; [`ProgressionBook`] and
//! [`crate::inventory::InventoryLedger`] are the in-memory references.

use std::collections::HashMap;
use std::sync::Arc;

use harvest_core::{ActorId, ItemId, SkillCategory};
use parking_lot::RwLock;

use crate::error::EconomyResult;

/// Actor progression per skill category.
pub trait Progression: Send + Sync {
    /// Whether the actor has joined the category (holds the job).
    fn has_category(&self, actor: ActorId, category: SkillCategory) -> bool;

    /// The actor's tier in the category; 0 when not joined.
    fn tier(&self, actor: ActorId, category: SkillCategory) -> u32;
}

/// Where delivered rewards go when pickup is bypassed.
pub trait HoldingSpace: Send + Sync {
    /// Stores up to `quantity` units and returns how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns an error when the actor has no holding space at all.
    fn store(&self, actor: ActorId, item_id: ItemId, quantity: u32) -> EconomyResult<u32>;
}

/// Handles to every collaborator the stock rules need.
#[derive(Clone)]
pub struct Services {
    /// Progression tiers, read by tier and currency rules.
    pub progression: Arc<dyn Progression>,
    /// Holding space, written by delivery.
    pub holding: Arc<dyn HoldingSpace>,
}

impl Services {
    /// Bundles collaborators.
    pub fn new(progression: Arc<dyn Progression>, holding: Arc<dyn HoldingSpace>) -> Self {
        Self {
            progression,
            holding,
        }
    }
}

/// In-memory progression store.
#[derive(Debug, Default)]
pub struct ProgressionBook {
    tiers: RwLock<HashMap<ActorId, HashMap<SkillCategory, u32>>>,
}

impl ProgressionBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins an actor to a category at tier 1 (no-op if already joined).
    pub fn join(&self, actor: ActorId, category: SkillCategory) {
        self.tiers
            .write()
            .entry(actor)
            .or_default()
            .entry(category)
            .or_insert(1);
    }

    /// Sets an actor's tier, joining them if needed.
    pub fn set_tier(&self, actor: ActorId, category: SkillCategory, tier: u32) {
        self.tiers
            .write()
            .entry(actor)
            .or_default()
            .insert(category, tier);
    }

    /// Removes an actor from a category.
    pub fn leave(&self, actor: ActorId, category: SkillCategory) {
        if let Some(categories) = self.tiers.write().get_mut(&actor) {
            categories.remove(&category);
        }
    }
}

impl Progression for ProgressionBook {
    fn has_category(&self, actor: ActorId, category: SkillCategory) -> bool {
        self.tiers
            .read()
            .get(&actor)
            .is_some_and(|categories| categories.contains_key(&category))
    }

    fn tier(&self, actor: ActorId, category: SkillCategory) -> u32 {
        self.tiers
            .read()
            .get(&actor)
            .and_then(|categories| categories.get(&category).copied())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_set_and_leave() {
        let book = ProgressionBook::new();
        assert!(!book.has_category(1, SkillCategory::Mining));
        assert_eq!(book.tier(1, SkillCategory::Mining), 0);

        book.join(1, SkillCategory::Mining);
        assert_eq!(book.tier(1, SkillCategory::Mining), 1);

        book.set_tier(1, SkillCategory::Mining, 7);
        book.join(1, SkillCategory::Mining);
        assert_eq!(book.tier(1, SkillCategory::Mining), 7);

        book.leave(1, SkillCategory::Mining);
        assert!(!book.has_category(1, SkillCategory::Mining));
    }
}
