//! # Drop Tables
//!
//! **What a block naturally yields before any rule runs.**
//!
//! The base yield must be a pure function of the subject and the tool, so
//! quantities inside a `min..=max` range are picked with an FNV-1a hash of
//! (block, tool, item) instead of a random draw. The same pickaxe on the
//! same block always yields the same base.

use std::collections::HashMap;

use harvest_core::{BaseYield, BlockId, ItemId, Reward, Subject, ToolSnapshot};
use serde::{Deserialize, Serialize};

/// One line of a block's drop table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Block that drops it.
    pub block_id: BlockId,
    /// Item dropped.
    pub item_id: ItemId,
    /// Minimum quantity.
    #[serde(default = "one")]
    pub min_quantity: u32,
    /// Maximum quantity.
    #[serde(default = "one")]
    pub max_quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Drop tables for every configured block.
#[derive(Clone, Debug, Default)]
pub struct DropTable {
    entries: HashMap<BlockId, Vec<DropEntry>>,
    self_drop: bool,
}

impl DropTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from configured entries.
    pub fn from_entries(entries: impl IntoIterator<Item = DropEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.register(entry);
        }
        table
    }

    /// Unlisted blocks drop one of themselves (item id = block id).
    #[must_use]
    pub fn with_self_drop(mut self, self_drop: bool) -> Self {
        self.self_drop = self_drop;
        self
    }

    /// Adds an entry. A reversed range is swapped.
    pub fn register(&mut self, mut entry: DropEntry) {
        if entry.min_quantity > entry.max_quantity {
            std::mem::swap(&mut entry.min_quantity, &mut entry.max_quantity);
        }
        self.entries.entry(entry.block_id).or_default().push(entry);
    }

    /// Number of blocks with a table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no block has a table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Base rewards for a block broken with `tool`.
    #[must_use]
    pub fn rewards_for(&self, block_id: BlockId, tool: &ToolSnapshot) -> Vec<Reward> {
        match self.entries.get(&block_id) {
            Some(entries) => entries
                .iter()
                .map(|entry| {
                    let span = entry.max_quantity - entry.min_quantity;
                    let pick = if span == 0 {
                        0
                    } else {
                        let hash = drop_hash(block_id, tool.item_id, entry.item_id);
                        (hash % (u64::from(span) + 1)) as u32
                    };
                    Reward::new(entry.item_id, entry.min_quantity + pick)
                })
                .collect(),
            None if self.self_drop => vec![Reward::new(block_id, 1)],
            None => Vec::new(),
        }
    }
}

impl BaseYield for DropTable {
    fn base_rewards(&self, subject: &Subject, tool: &ToolSnapshot) -> Vec<Reward> {
        self.rewards_for(subject.block_id, tool)
    }
}

/// FNV-1a over the drop inputs.
#[inline]
fn drop_hash(block_id: BlockId, tool_id: ItemId, item_id: ItemId) -> u64 {
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

    let mut hash = FNV_OFFSET;
    hash ^= u64::from(block_id);
    hash = hash.wrapping_mul(FNV_PRIME);
    hash ^= u64::from(tool_id);
    hash = hash.wrapping_mul(FNV_PRIME);
    hash ^= u64::from(item_id);
    hash = hash.wrapping_mul(FNV_PRIME);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(block_id: BlockId, item_id: ItemId, min: u32, max: u32) -> DropEntry {
        DropEntry {
            block_id,
            item_id,
            min_quantity: min,
            max_quantity: max,
        }
    }

    #[test]
    fn test_deterministic_base_yield() {
        let table = DropTable::from_entries([entry(16, 263, 1, 4), entry(16, 4, 1, 1)]);
        let tool = ToolSnapshot::new(278);

        let first = table.rewards_for(16, &tool);
        for _ in 0..10 {
            assert_eq!(table.rewards_for(16, &tool), first);
        }
        assert_eq!(first.len(), 2);
        assert!((1..=4).contains(&first[0].quantity));
        assert_eq!(first[1], Reward::new(4, 1));
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let table = DropTable::from_entries([entry(1, 2, 5, 3)]);
        let quantity = table.rewards_for(1, &ToolSnapshot::bare_hands())[0].quantity;
        assert!((3..=5).contains(&quantity));
    }

    #[test]
    fn test_unlisted_blocks() {
        let table = DropTable::new();
        assert!(table.rewards_for(12, &ToolSnapshot::bare_hands()).is_empty());

        let table = table.with_self_drop(true);
        assert_eq!(
            table.rewards_for(12, &ToolSnapshot::bare_hands()),
            vec![Reward::new(12, 1)]
        );
    }
}
