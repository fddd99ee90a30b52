//! # Pipeline Configuration
//!
//! Every rule table is loaded from TOML once at startup:
//!
//! ```toml
//! seed = 42
//! protected_rarity = "epic"
//!
//! [flags]
//! enabled = true
//!
//! [yield_multiplier]
//! standard_factors = [1.5, 2.0, 2.5]
//!
//! [[bonus_drop]]
//! name = "lucky_strike"
//! trait_id = "lucky"
//! base_chance = 0.05
//! effect = { kind = "append", item_id = 264, quantity = 1 }
//!
//! [delivery]
//! bypass_trait = "direct_pickup"
//! ```
//!
//! Out-of-range numbers are clamped with a warning. Structural problems
//! (empty names, empty trait ids) are configuration errors.

use std::path::Path;

use harvest_core::{
    clamp_chance, HarvestResult, PipelineBuilder, PipelineEngine, PipelineError, PipelineFlags, Rarity,
    SharedFlags,
};
use serde::{Deserialize, Serialize};

use crate::drops::{DropEntry, DropTable};
use crate::rules::{
    BonusDropChance, BonusDropSettings, BonusEffect, ConsumableEffect, ConversionSettings,
    CurrencyBonus, CurrencySettings, Delivery, DeliverySettings, ExperienceGrant, ExperienceSettings,
    Replant, ReplantSettings, TierBonus, TierBonusSettings, YieldMultiplier, YieldMultiplierSettings,
};
use crate::services::Services;

/// `[flags]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSettings {
    /// Feature flag.
    pub enabled: bool,
    /// Per-rule traces.
    pub debug: bool,
}

impl Default for FlagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
        }
    }
}

impl From<FlagSettings> for PipelineFlags {
    fn from(settings: FlagSettings) -> Self {
        Self {
            enabled: settings.enabled,
            debug: settings.debug,
        }
    }
}

/// The whole pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for the randomness source; omitted means clock-seeded.
    pub seed: Option<u64>,
    /// Subjects at or above this rarity are non-duplicable.
    pub protected_rarity: Rarity,
    /// Blocks without a drop table drop themselves.
    pub self_drop: bool,
    /// Host-wide switches.
    pub flags: FlagSettings,
    /// `[yield_multiplier]`
    pub yield_multiplier: Option<YieldMultiplierSettings>,
    /// `[[bonus_drop]]`
    pub bonus_drop: Vec<BonusDropSettings>,
    /// `[tier_bonus]`
    pub tier_bonus: Option<TierBonusSettings>,
    /// `[[conversion]]`
    pub conversion: Vec<ConversionSettings>,
    /// `[replant]`
    pub replant: Option<ReplantSettings>,
    /// `[currency]`
    pub currency: Option<CurrencySettings>,
    /// `[experience]`
    pub experience: Option<ExperienceSettings>,
    /// `[delivery]`
    pub delivery: Option<DeliverySettings>,
    /// `[[drops]]`
    pub drops: Vec<DropEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            protected_rarity: Rarity::Epic,
            self_drop: true,
            flags: FlagSettings::default(),
            yield_multiplier: None,
            bonus_drop: Vec::new(),
            tier_bonus: None,
            conversion: Vec::new(),
            replant: None,
            currency: None,
            experience: None,
            delivery: None,
            drops: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidConfig` on malformed TOML or structural
    /// problems.
    pub fn from_toml_str(source: &str) -> HarvestResult<Self> {
        let mut config: Self =
            toml::from_str(source).map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.sanitize()?;
        tracing::info!(
            bonus_drops = config.bonus_drop.len(),
            conversions = config.conversion.len(),
            drop_entries = config.drops.len(),
            "pipeline configuration loaded"
        );
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigIo` if the file cannot be read, otherwise
    /// as [`PipelineConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> HarvestResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| PipelineError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// The configured flags.
    #[must_use]
    pub fn flags(&self) -> PipelineFlags {
        self.flags.into()
    }

    /// Hot-reloadable flags starting from `[flags]`. Hand a clone to
    /// [`PipelineConfig::builder`] and keep one to flip at runtime.
    #[must_use]
    pub fn shared_flags(&self) -> SharedFlags {
        SharedFlags::new(self.flags())
    }

    /// The configured drop table.
    #[must_use]
    pub fn drop_table(&self) -> DropTable {
        DropTable::from_entries(self.drops.iter().cloned()).with_self_drop(self.self_drop)
    }

    /// A builder with the drop table, seed and every configured rule
    /// registered, reading its flags from `flags`. The host may add its own
    /// rules before building.
    #[must_use]
    pub fn builder(&self, services: &Services, flags: &SharedFlags) -> PipelineBuilder {
        let mut builder = PipelineEngine::builder();
        builder.base_yield(self.drop_table()).flags(flags.clone());
        if let Some(seed) = self.seed {
            builder.seed(seed);
        }

        if let Some(settings) = &self.yield_multiplier {
            builder.register(YieldMultiplier::new(settings.clone()));
        }
        for settings in &self.bonus_drop {
            builder.register(BonusDropChance::new(settings.clone()));
        }
        if let Some(settings) = &self.tier_bonus {
            builder.register(TierBonus::new(settings.clone(), services.progression.clone()));
        }
        for settings in &self.conversion {
            builder.register(ConsumableEffect::new(settings.clone(), self.protected_rarity));
        }
        if let Some(settings) = &self.replant {
            builder.register(Replant::new(settings.clone()));
        }
        if let Some(settings) = &self.currency {
            builder.register(CurrencyBonus::new(settings.clone(), services.progression.clone()));
        }
        if let Some(settings) = &self.experience {
            builder.register(ExperienceGrant::new(settings.clone()));
        }
        if let Some(settings) = &self.delivery {
            builder.register(Delivery::new(settings.clone(), services.holding.clone()));
        }
        builder
    }

    /// Builds the engine straight from the configuration.
    ///
    /// # Errors
    ///
    /// Returns the builder's ordering errors.
    pub fn build_engine(
        &self,
        services: &Services,
        flags: &SharedFlags,
    ) -> HarvestResult<PipelineEngine> {
        self.builder(services, flags).build()
    }

    /// Clamps numeric values and rejects structural problems.
    fn sanitize(&mut self) -> HarvestResult<()> {
        if let Some(settings) = &mut self.yield_multiplier {
            require("yield_multiplier", "name", &settings.name)?;
            require(&settings.name, "standard_trait", &settings.standard_trait)?;
            require(&settings.name, "extended_trait", &settings.extended_trait)?;
            let rule = settings.name.clone();
            sanitize_factors(&rule, "standard_factors", &mut settings.standard_factors);
            sanitize_factors(&rule, "extended_factors", &mut settings.extended_factors);
        }

        for settings in &mut self.bonus_drop {
            require("bonus_drop", "name", &settings.name)?;
            require(&settings.name, "trait_id", &settings.trait_id)?;
            settings.base_chance = clamp_probability(&settings.name, "base_chance", settings.base_chance);
            if !settings.per_level.is_finite() {
                tracing::warn!(rule = %settings.name, value = settings.per_level, "per_level is not finite, using 0");
                settings.per_level = 0.0;
            }
            match &mut settings.effect {
                BonusEffect::Multiply { factor } if !factor.is_finite() || *factor < 1.0 => {
                    tracing::warn!(rule = %settings.name, value = *factor, "multiply factor below 1, using 1");
                    *factor = 1.0;
                }
                BonusEffect::Append { quantity: 0, .. } => {
                    tracing::warn!(rule = %settings.name, "append quantity is 0, the rule will never fire");
                }
                _ => {}
            }
        }

        if let Some(settings) = &mut self.tier_bonus {
            require("tier_bonus", "name", &settings.name)?;
            settings.per_tier = clamp_probability(&settings.name, "per_tier", settings.per_tier);
            settings.max_chance = clamp_probability(&settings.name, "max_chance", settings.max_chance);
        }

        for settings in &mut self.conversion {
            require("conversion", "name", &settings.name)?;
            require(&settings.name, "trait_id", &settings.trait_id)?;
            settings.chance = clamp_probability(&settings.name, "chance", settings.chance);
            settings.protected_ceiling =
                clamp_probability(&settings.name, "protected_ceiling", settings.protected_ceiling);
            let rule = settings.name.clone();
            settings.mappings.retain(|mapping| {
                let keep = mapping.from != mapping.to;
                if !keep {
                    tracing::warn!(rule = %rule, item = mapping.from, "conversion maps an item to itself, ignored");
                }
                keep
            });
        }

        if let Some(settings) = &self.replant {
            require("replant", "name", &settings.name)?;
            require(&settings.name, "trait_id", &settings.trait_id)?;
        }
        if let Some(settings) = &self.currency {
            require("currency", "name", &settings.name)?;
        }
        if let Some(settings) = &self.experience {
            require("experience", "name", &settings.name)?;
        }
        if let Some(settings) = &self.delivery {
            require("delivery", "name", &settings.name)?;
            require(&settings.name, "bypass_trait", &settings.bypass_trait)?;
        }
        Ok(())
    }
}

fn require(section: &str, field: &str, value: &str) -> HarvestResult<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidConfig(format!(
            "{section}: `{field}` must not be empty"
        )));
    }
    Ok(())
}

fn clamp_probability(rule: &str, field: &str, value: f64) -> f64 {
    let clamped = clamp_chance(value);
    if clamped.to_bits() != value.to_bits() {
        tracing::warn!(rule, field, value, clamped, "probability out of range, clamped");
    }
    clamped
}

fn sanitize_factors(rule: &str, field: &str, factors: &mut [f64]) {
    for factor in factors.iter_mut() {
        if !factor.is_finite() || *factor < 1.0 {
            tracing::warn!(rule, field, value = *factor, "yield factor below 1, using 1");
            *factor = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_loads() {
        let config = PipelineConfig::from_toml_str(include_str!("../data/pipeline.toml")).unwrap();
        assert!(config.yield_multiplier.is_some());
        assert_eq!(config.bonus_drop.len(), 2);
        assert!(config.delivery.is_some());
        assert!(!config.drops.is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.flags().enabled);
    }

    #[test]
    fn test_out_of_range_chances_are_clamped() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[bonus_drop]]
            name = "broken"
            trait_id = "lucky"
            base_chance = -0.5
            effect = { kind = "multiply", factor = 0.25 }

            [[conversion]]
            name = "smelt"
            trait_id = "auto_smelt"
            chance = 3.0
            protected_ceiling = 0.1
            mappings = [{ from = 15, to = 265 }, { from = 4, to = 4 }]
            "#,
        )
        .unwrap();

        let bonus = &config.bonus_drop[0];
        assert_eq!(bonus.base_chance, 0.0);
        assert_eq!(bonus.effect, BonusEffect::Multiply { factor: 1.0 });

        let conversion = &config.conversion[0];
        assert_eq!(conversion.chance, 1.0);
        assert_eq!(conversion.mappings.len(), 1);
    }

    #[test]
    fn test_structural_errors() {
        let missing_trait = PipelineConfig::from_toml_str(
            r#"
            [[bonus_drop]]
            name = "lucky"
            trait_id = ""
            base_chance = 0.1
            effect = { kind = "append", item_id = 1, quantity = 1 }
            "#,
        );
        assert!(matches!(missing_trait, Err(PipelineError::InvalidConfig(_))));

        let malformed = PipelineConfig::from_toml_str("[[bonus_drop]]\nname = 3");
        assert!(matches!(malformed, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_configured_engine_follows_shared_flags() {
        use crate::inventory::InventoryLedger;
        use crate::services::ProgressionBook;
        use harvest_core::{Interaction, PipelineOptions, SkillCategory, Subject, ToolSnapshot};
        use std::sync::Arc;

        let config = PipelineConfig::from_toml_str(include_str!("../data/pipeline.toml")).unwrap();
        let flags = config.shared_flags();
        let services = Services::new(Arc::new(ProgressionBook::new()), Arc::new(InventoryLedger::new()));
        let engine = config.build_engine(&services, &flags).unwrap();

        let interaction = Interaction::new(1, Subject::new(1, SkillCategory::Mining), ToolSnapshot::new(278));
        assert!(engine.process(&interaction, &PipelineOptions::all()).is_some());

        flags.set_enabled(false);
        assert!(engine.process(&interaction, &PipelineOptions::all()).is_none());

        flags.replace(config.flags());
        assert!(engine.process(&interaction, &PipelineOptions::all()).is_some());
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file("/nonexistent/pipeline.toml");
        assert!(matches!(result, Err(PipelineError::ConfigIo { .. })));
    }
}
