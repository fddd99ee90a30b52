//! # Inventory Ledger
//!
//! Reference holding space for delivery: one slotted inventory per actor,
//! kept behind a `parking_lot::RwLock`. Each slot holds at most one reward
//! line of up to `max_stack` units. Slots are allocated when the inventory
//! is opened; storing never grows it.

use std::collections::HashMap;

use harvest_core::{ActorId, ItemId, Reward};
use parking_lot::RwLock;

use crate::error::{EconomyError, EconomyResult};
use crate::services::HoldingSpace;

/// Slots in a player inventory.
pub const DEFAULT_INVENTORY_SLOTS: usize = 36;

/// Default stack limit.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// A fixed-capacity slotted inventory.
#[derive(Clone, Debug)]
pub struct Inventory {
    slots: Vec<Option<Reward>>,
    max_stack: u32,
}

impl Inventory {
    /// Creates an empty inventory with `slots` slots.
    #[must_use]
    pub fn new(slots: usize, max_stack: u32) -> Self {
        Self {
            slots: vec![None; slots],
            max_stack: max_stack.max(1),
        }
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Total slot count.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Units of `item_id` held across all slots.
    #[must_use]
    pub fn count_item(&self, item_id: ItemId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|line| line.item_id == item_id)
            .fold(0, |total, line| total.saturating_add(line.quantity))
    }

    /// How many units of `item_id` would still fit.
    #[must_use]
    pub fn room_for(&self, item_id: ItemId) -> u64 {
        self.slots
            .iter()
            .map(|slot| match slot {
                None => u64::from(self.max_stack),
                Some(line) if line.item_id == item_id => {
                    u64::from(self.max_stack.saturating_sub(line.quantity))
                }
                Some(_) => 0,
            })
            .sum()
    }

    /// Stores as many units as fit and returns how many were accepted.
    ///
    /// Tops up lines of the same item first, then fills empty slots.
    pub fn try_add(&mut self, item_id: ItemId, count: u32) -> u32 {
        let max_stack = self.max_stack;
        let mut remaining = count;

        for line in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if line.item_id == item_id && line.quantity < max_stack {
                let topped = (max_stack - line.quantity).min(remaining);
                line.quantity += topped;
                remaining -= topped;
            }
        }

        for slot in self.slots.iter_mut().filter(|slot| slot.is_none()) {
            if remaining == 0 {
                break;
            }
            let placed = remaining.min(max_stack);
            *slot = Some(Reward::new(item_id, placed));
            remaining -= placed;
        }

        count - remaining
    }

    /// Stores every unit or none of them.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InventoryFull` if they do not all fit; the
    /// inventory is left untouched.
    pub fn add(&mut self, item_id: ItemId, count: u32) -> EconomyResult<()> {
        let snapshot = self.snapshot();
        let accepted = self.try_add(item_id, count);
        if accepted < count {
            self.restore(snapshot);
            return Err(EconomyError::InventoryFull {
                capacity: u32::try_from(self.capacity()).unwrap_or(u32::MAX),
                amount: count - accepted,
            });
        }
        Ok(())
    }

    /// Copies the slots for a later [`Inventory::restore`].
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            slots: self.slots.clone(),
        }
    }

    /// Puts the slots back the way a snapshot saw them.
    pub fn restore(&mut self, snapshot: InventorySnapshot) {
        self.slots = snapshot.slots;
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SLOTS, DEFAULT_MAX_STACK)
    }
}

/// Saved slot contents.
#[derive(Clone, Debug)]
pub struct InventorySnapshot {
    slots: Vec<Option<Reward>>,
}

/// Per-actor inventories, shared between the host and delivery.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    inventories: RwLock<HashMap<ActorId, Inventory>>,
}

impl InventoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or replaces) an actor's inventory.
    pub fn open(&self, actor: ActorId, inventory: Inventory) {
        self.inventories.write().insert(actor, inventory);
    }

    /// Units of an item an actor holds (0 if no inventory is open).
    #[must_use]
    pub fn count(&self, actor: ActorId, item_id: ItemId) -> u32 {
        self.inventories
            .read()
            .get(&actor)
            .map_or(0, |inventory| inventory.count_item(item_id))
    }

    /// Copy of an actor's inventory.
    #[must_use]
    pub fn inventory(&self, actor: ActorId) -> Option<Inventory> {
        self.inventories.read().get(&actor).cloned()
    }
}

impl HoldingSpace for InventoryLedger {
    fn store(&self, actor: ActorId, item_id: ItemId, quantity: u32) -> EconomyResult<u32> {
        let mut inventories = self.inventories.write();
        let inventory = inventories
            .get_mut(&actor)
            .ok_or(EconomyError::UnknownActor(actor))?;
        Ok(inventory.try_add(item_id, quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_top_up_before_new_slots() {
        let mut inv = Inventory::new(4, 64);
        inv.add(1, 64).unwrap();
        inv.add(1, 10).unwrap();
        assert_eq!(inv.count_item(1), 74);
        assert_eq!(inv.used_slots(), 2);

        inv.add(1, 4).unwrap();
        assert_eq!(inv.used_slots(), 2);
    }

    #[test]
    fn test_try_add_is_partial() {
        let mut inv = Inventory::new(1, 64);
        inv.add(5, 63).unwrap();
        assert_eq!(inv.room_for(5), 1);
        assert_eq!(inv.try_add(5, 2), 1);
        assert_eq!(inv.count_item(5), 64);
        assert_eq!(inv.try_add(6, 1), 0);
    }

    #[test]
    fn test_add_is_all_or_nothing() {
        let mut inv = Inventory::new(1, 64);
        inv.add(5, 60).unwrap();
        let result = inv.add(5, 10);
        assert_eq!(
            result,
            Err(EconomyError::InventoryFull {
                capacity: 1,
                amount: 6
            })
        );
        assert_eq!(inv.count_item(5), 60);
    }

    #[test]
    fn test_ledger_rejects_unknown_actor() {
        let ledger = InventoryLedger::new();
        assert_eq!(ledger.store(9, 1, 1), Err(EconomyError::UnknownActor(9)));

        ledger.open(9, Inventory::default());
        assert_eq!(ledger.store(9, 1, 3), Ok(3));
        assert_eq!(ledger.count(9, 1), 3);
        assert_eq!(ledger.inventory(9).map(|inv| inv.used_slots()), Some(1));
    }
}
