//! Weapon stat contract and the standard gun.

use serde::{Deserialize, Serialize};

/// Fastest allowed cooldown between shots, in seconds.
pub const MIN_FIRE_COOLDOWN: f32 = 0.01;

/// Anything that scales with the global player modifiers.
pub trait Weapon {
    fn name(&self) -> &str;
    fn update_stats_from_global(&mut self, damage_multiplier: f32, fire_rate_multiplier: f32);
    /// Damage per hit with the last broadcast applied.
    fn current_damage(&self) -> f32;
    /// Seconds between shots with the last broadcast applied.
    fn current_cooldown(&self) -> f32;
}

/// Damage per hit after the global multiplier.
pub fn effective_damage(base_damage: f32, damage_multiplier: f32) -> f32 {
    base_damage * damage_multiplier
}

/// Cooldown after the global fire-rate multiplier, floored at
/// [`MIN_FIRE_COOLDOWN`]. A non-positive multiplier leaves the base cooldown.
pub fn effective_cooldown(base_cooldown: f32, fire_rate_multiplier: f32) -> f32 {
    if fire_rate_multiplier <= 0.0 {
        return base_cooldown.max(MIN_FIRE_COOLDOWN);
    }
    (base_cooldown / fire_rate_multiplier).max(MIN_FIRE_COOLDOWN)
}

/// Base and current stats for a hitscan gun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GunStats {
    pub name: String,
    pub base_damage: f32,
    pub base_cooldown: f32,
    current_damage: f32,
    current_cooldown: f32,
}

impl GunStats {
    pub fn new(name: impl Into<String>, base_damage: f32, base_cooldown: f32) -> Self {
        Self {
            name: name.into(),
            base_damage,
            base_cooldown,
            current_damage: effective_damage(base_damage, 1.0),
            current_cooldown: effective_cooldown(base_cooldown, 1.0),
        }
    }

    /// The starter pistol: 10 damage, 0.25 s cooldown.
    pub fn pistol() -> Self {
        Self::new("Pistol", 10.0, 0.25)
    }

    /// Rifle firing 10 rounds per second.
    pub fn rifle() -> Self {
        Self::new("Rifle", 10.0, 0.1)
    }
}

impl Weapon for GunStats {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_stats_from_global(&mut self, damage_multiplier: f32, fire_rate_multiplier: f32) {
        self.current_damage = effective_damage(self.base_damage, damage_multiplier);
        self.current_cooldown = effective_cooldown(self.base_cooldown, fire_rate_multiplier);
        log::debug!(
            "{} stats: damage {:.2}, cooldown {:.3}s",
            self.name,
            self.current_damage,
            self.current_cooldown
        );
    }

    fn current_damage(&self) -> f32 {
        self.current_damage
    }

    fn current_cooldown(&self) -> f32 {
        self.current_cooldown
    }
}
