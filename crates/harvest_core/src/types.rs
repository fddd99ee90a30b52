//! # Interaction Types
//!
//! Plain data describing what happened in the world: who acted, what they
//! acted on, with which tool and how the action was triggered.

use serde::{Deserialize, Serialize};

use crate::tool::ToolSnapshot;

/// Actor (player) identifier.
pub type ActorId = u64;

/// Item type identifier.
pub type ItemId = u32;

/// Block type identifier.
pub type BlockId = u32;

/// Integer world position of the subject.
pub type BlockPos = [i32; 3];

/// Rarity tier of a subject.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Common blocks (stone, dirt, logs).
    #[default]
    Common = 0,
    /// Uncommon blocks (coal, copper).
    Uncommon = 1,
    /// Rare blocks (gold, lapis).
    Rare = 2,
    /// Epic blocks (diamond).
    Epic = 3,
    /// Legendary blocks (ancient debris).
    Legendary = 4,
    /// Mythic blocks (spawners, event nodes).
    Mythic = 5,
}

/// Progression category an interaction belongs to.
///
/// Experience is accumulated per category and tiers are looked up per
/// category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    /// Ores and stone.
    Mining,
    /// Logs and leaves.
    Woodcutting,
    /// Dirt, sand and gravel.
    Excavation,
    /// Crops.
    Farming,
    /// Catches.
    Fishing,
}

impl SkillCategory {
    /// All categories in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Mining,
        Self::Woodcutting,
        Self::Excavation,
        Self::Farming,
        Self::Fishing,
    ];

    /// Stable lowercase name, used in logs and config.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mining => "mining",
            Self::Woodcutting => "woodcutting",
            Self::Excavation => "excavation",
            Self::Farming => "farming",
            Self::Fishing => "fishing",
        }
    }
}

/// How the interaction was triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// A direct action by the actor.
    #[default]
    Normal,
    /// Caused by another effect (multi-break, vein mining, tree felling).
    Chained,
}

/// The thing being interacted with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    /// Block type.
    pub block_id: BlockId,
    /// Progression category of the block.
    pub category: SkillCategory,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Explicitly marked as non-duplicable (placed-by-player ores, event
    /// nodes). Conversion effects clamp their chance on these.
    pub non_duplicable: bool,
}

impl Subject {
    /// Creates a common, duplicable subject.
    #[must_use]
    pub const fn new(block_id: BlockId, category: SkillCategory) -> Self {
        Self {
            block_id,
            category,
            rarity: Rarity::Common,
            non_duplicable: false,
        }
    }

    /// Sets the rarity.
    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    /// Marks the subject non-duplicable.
    #[must_use]
    pub fn non_duplicable(mut self) -> Self {
        self.non_duplicable = true;
        self
    }

    /// Returns true when the subject is flagged, or its rarity is at or
    /// above `threshold`.
    #[inline]
    #[must_use]
    pub fn is_protected(&self, threshold: Rarity) -> bool {
        self.non_duplicable || self.rarity >= threshold
    }
}

/// A single reward line: an item kind and a positive quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reward {
    /// Item type.
    pub item_id: ItemId,
    /// Number of units, always at least 1 once stored in a context.
    pub quantity: u32,
}

impl Reward {
    /// Creates a reward line.
    #[inline]
    #[must_use]
    pub const fn new(item_id: ItemId, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

/// A raw interaction handed to the pipeline by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    /// The acting player.
    pub actor: ActorId,
    /// What was interacted with.
    pub subject: Subject,
    /// Where it happened.
    pub position: BlockPos,
    /// Copy of the tool at the moment of the interaction.
    pub tool: ToolSnapshot,
    /// Direct or chained.
    pub trigger: TriggerKind,
}

impl Interaction {
    /// Creates a normal-trigger interaction at the origin.
    #[must_use]
    pub fn new(actor: ActorId, subject: Subject, tool: ToolSnapshot) -> Self {
        Self {
            actor,
            subject,
            position: [0, 0, 0],
            tool,
            trigger: TriggerKind::Normal,
        }
    }

    /// Sets the world position.
    #[must_use]
    pub fn at(mut self, position: BlockPos) -> Self {
        self.position = position;
        self
    }

    /// Marks the interaction as chained from another effect.
    #[must_use]
    pub fn chained(mut self) -> Self {
        self.trigger = TriggerKind::Chained;
        self
    }
}
