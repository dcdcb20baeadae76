//! Upgrade definitions and the weighted rarity roll.
//!
//! The catalog is a fixed table built once at startup. Each time a selection
//! slot is filled, a definition is "rolled" into an [`UpgradeRoll`] carrying
//! the rarity tier, the scaled value, and the presentation name/color.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// What an upgrade does when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeType {
    HealToFull,
    IncreaseMaxHealth,
    DamageReduction,
    MovementSpeed,
    /// Global damage multiplier for every weapon.
    Damage,
    /// Global fire-rate multiplier for every weapon.
    FireRate,
}

impl UpgradeType {
    /// Whether applying this upgrade changes the global weapon modifiers.
    pub fn is_global_weapon_stat(self) -> bool {
        matches!(self, Self::Damage | Self::FireRate)
    }
}

/// Chance of an Epic roll.
pub const EPIC_CHANCE: f32 = 0.10;
/// Chance of a Rare roll.
pub const RARE_CHANCE: f32 = 0.30;
/// Chance of a Common roll.
pub const COMMON_CHANCE: f32 = 0.60;

const RARE_MULTIPLIER: f32 = 2.0;
const EPIC_MULTIPLIER: f32 = 3.0;

/// Value carried by Fixed rolls. Heal-to-full ignores it.
pub const FIXED_SENTINEL_VALUE: f32 = 1.0;

/// Rarity tier scaling an upgrade's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    /// Not drawn; used for heal-to-full.
    Fixed,
}

impl Rarity {
    /// Map a uniform sample in `[0, 1)` to a tier.
    ///
    /// Epic is checked first, then Rare, then everything else is Common:
    /// `[0, 0.10)` Epic, `[0.10, 0.40)` Rare, `[0.40, 1)` Common.
    pub fn from_sample(r: f32) -> Self {
        if r < EPIC_CHANCE {
            Self::Epic
        } else if r < EPIC_CHANCE + RARE_CHANCE {
            Self::Rare
        } else {
            Self::Common
        }
    }

    /// Draw a tier from `rng` using a single uniform sample.
    pub fn draw(rng: &mut impl Rng) -> Self {
        Self::from_sample(rng.gen::<f32>())
    }

    pub fn value_multiplier(self) -> f32 {
        match self {
            Self::Common => 1.0,
            Self::Rare => RARE_MULTIPLIER,
            Self::Epic => EPIC_MULTIPLIER,
            Self::Fixed => 1.0,
        }
    }

    pub fn color(self) -> DisplayColor {
        match self {
            Self::Common => DisplayColor::WHITE,
            Self::Rare => DisplayColor::LIGHT_BLUE,
            Self::Epic => DisplayColor::LIGHT_PURPLE,
            Self::Fixed => DisplayColor::LIGHT_GREEN,
        }
    }
}

/// RGB color in `[0, 1]` used to tint a choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl DisplayColor {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const LIGHT_BLUE: Self = Self::rgb(0.6, 0.8, 1.0);
    pub const LIGHT_PURPLE: Self = Self::rgb(0.8, 0.6, 1.0);
    pub const LIGHT_GREEN: Self = Self::rgb(0.6, 1.0, 0.6);
    /// Tint for a choice that has already been picked.
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeDefinition {
    /// Unique identifier, e.g. `"max_health_boost"`.
    pub id: &'static str,
    pub kind: UpgradeType,
    /// Display name with one `{}` placeholder for the value.
    pub name_template: &'static str,
    /// Value at Common rarity.
    pub base_value: f32,
}

impl UpgradeDefinition {
    pub const fn new(
        id: &'static str,
        kind: UpgradeType,
        name_template: &'static str,
        base_value: f32,
    ) -> Self {
        Self {
            id,
            kind,
            name_template,
            base_value,
        }
    }

    /// Substitute `value`, rendered as a whole number, into the template.
    pub fn format_name(&self, value: f32) -> String {
        self.name_template
            .replacen("{}", &format!("{:.0}", value), 1)
    }
}

/// A definition rolled for one selection slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeRoll {
    pub definition: UpgradeDefinition,
    pub rarity: Rarity,
    pub actual_value: f32,
    pub display_name: String,
    pub display_color: DisplayColor,
}

impl UpgradeRoll {
    /// Build a roll at a specific tier without drawing.
    ///
    /// Heal-to-full definitions always come out Fixed regardless of `rarity`.
    pub fn with_rarity(definition: &UpgradeDefinition, rarity: Rarity) -> Self {
        let rarity = if definition.kind == UpgradeType::HealToFull {
            Rarity::Fixed
        } else {
            rarity
        };

        let (actual_value, display_name) = match rarity {
            // The heal template has no placeholder, so it renders as-is.
            Rarity::Fixed => (
                FIXED_SENTINEL_VALUE,
                definition.format_name(FIXED_SENTINEL_VALUE),
            ),
            _ => {
                let value = definition.base_value * rarity.value_multiplier();
                (value, definition.format_name(value))
            }
        };

        Self {
            definition: definition.clone(),
            rarity,
            actual_value,
            display_name,
            display_color: rarity.color(),
        }
    }

    pub fn kind(&self) -> UpgradeType {
        self.definition.kind
    }
}

/// The fixed set of upgrades the station draws from.
#[derive(Debug, Clone)]
pub struct UpgradeCatalog {
    heal_to_full: UpgradeDefinition,
    random_pool: Vec<UpgradeDefinition>,
}

impl UpgradeCatalog {
    /// Catalog with a custom random pool. Heal-to-full definitions in `pool`
    /// are dropped; heal only ever occupies its reserved slot.
    pub fn new(heal_to_full: UpgradeDefinition, pool: Vec<UpgradeDefinition>) -> Self {
        let random_pool: Vec<_> = pool
            .into_iter()
            .filter(|d| d.kind != UpgradeType::HealToFull)
            .collect();
        if random_pool.len() < 3 {
            log::warn!(
                "Upgrade pool has {} definitions, some slots will stay empty",
                random_pool.len()
            );
        }
        Self {
            heal_to_full,
            random_pool,
        }
    }

    /// The standard five random upgrades plus the heal-to-full singleton.
    pub fn standard() -> Self {
        Self {
            heal_to_full: UpgradeDefinition::new(
                "heal_full",
                UpgradeType::HealToFull,
                "Heal to Full",
                0.0,
            ),
            random_pool: vec![
                UpgradeDefinition::new(
                    "max_health_boost",
                    UpgradeType::IncreaseMaxHealth,
                    "+{} Max Health",
                    10.0,
                ),
                UpgradeDefinition::new(
                    "dmg_reduction",
                    UpgradeType::DamageReduction,
                    "+{}% Damage Reduction",
                    5.0,
                ),
                UpgradeDefinition::new(
                    "move_speed_boost",
                    UpgradeType::MovementSpeed,
                    "+{}% Movement Speed",
                    10.0,
                ),
                UpgradeDefinition::new(
                    "gun_dmg_boost",
                    UpgradeType::Damage,
                    "+{}% Gun Damage",
                    10.0,
                ),
                UpgradeDefinition::new(
                    "gun_fire_rate_boost",
                    UpgradeType::FireRate,
                    "+{}% Gun Fire Rate",
                    15.0,
                ),
            ],
        }
    }

    /// Definitions eligible for random draws. Heal-to-full is not among them.
    pub fn all_definitions(&self) -> &[UpgradeDefinition] {
        &self.random_pool
    }

    pub fn heal_to_full(&self) -> &UpgradeDefinition {
        &self.heal_to_full
    }

    pub fn find(&self, id: &str) -> Option<&UpgradeDefinition> {
        std::iter::once(&self.heal_to_full)
            .chain(self.random_pool.iter())
            .find(|d| d.id == id)
    }

    /// Roll `definition` into a presentable upgrade.
    ///
    /// `force_fixed` (or a heal-to-full definition) skips the rarity draw and
    /// consumes no randomness.
    pub fn roll(
        &self,
        definition: &UpgradeDefinition,
        force_fixed: bool,
        rng: &mut impl Rng,
    ) -> UpgradeRoll {
        if force_fixed || definition.kind == UpgradeType::HealToFull {
            return UpgradeRoll::with_rarity(definition, Rarity::Fixed);
        }
        UpgradeRoll::with_rarity(definition, Rarity::draw(rng))
    }
}

impl Default for UpgradeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
