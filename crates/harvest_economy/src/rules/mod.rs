//! # Stock Rules
//!
//! | Rule | Category | Default priority |
//! |---|---|---|
//! | [`YieldMultiplier`] | Multiplier | 100 |
//! | [`BonusDropChance`] | BonusDrop | 200 |
//! | [`TierBonus`] | TierBonus | 300 |
//! | [`ConsumableEffect`] | Conversion | 400 |
//! | [`Replant`] | Replant | 450 |
//! | [`CurrencyBonus`] | Currency | 800 |
//! | [`ExperienceGrant`] | Experience | 900 |
//! | [`Delivery`] | Delivery | 1000 |

pub mod bonus_drop;
pub mod conversion;
pub mod currency;
pub mod delivery;
pub mod experience;
pub mod replant;
pub mod tier_bonus;
pub mod yield_multiplier;

pub use bonus_drop::{BonusDropChance, BonusDropSettings, BonusEffect};
pub use conversion::{ConsumableEffect, ConversionMapping, ConversionSettings};
pub use currency::{CurrencyBonus, CurrencySettings, ItemPayout};
pub use delivery::{Delivery, DeliverySettings};
pub use experience::{ExperienceGrant, ExperienceSettings, ItemExperience};
pub use replant::{Replant, ReplantSettings, SeedMapping};
pub use tier_bonus::{TierBonus, TierBonusSettings};
pub use yield_multiplier::{Boost, BoostSource, TierTieBreak, YieldMultiplier, YieldMultiplierSettings};

use harvest_core::SkillCategory;

/// An empty list allows every category.
#[inline]
pub(crate) fn category_allowed(allowed: &[SkillCategory], category: SkillCategory) -> bool {
    allowed.is_empty() || allowed.contains(&category)
}
