//! Player stats touched by upgrades.
//!
//! Health, damage reduction (capped at 50%), and a movement speed multiplier.
//! The progression engine talks to the player through [`PlayerStats`] so a
//! host engine can back it with its own character controller.

use serde::{Deserialize, Serialize};

/// Damage reduction never exceeds this fraction.
pub const DAMAGE_REDUCTION_CAP: f32 = 0.5;

/// What the progression engine needs from the player.
pub trait PlayerStats {
    fn heal_to_full(&mut self);
    fn increase_max_health(&mut self, amount: f32);
    /// Returns `false` when the increase was rejected because reduction is
    /// already at the cap.
    fn increase_damage_reduction(&mut self, pct: f32) -> bool;
    fn increase_movement_speed(&mut self, pct: f32);
    fn is_damage_reduction_capped(&self) -> bool;

    /// Apply incoming damage; returns the health actually lost.
    fn take_damage(&mut self, amount: f32) -> f32;

    fn current_health(&self) -> f32;
    fn max_health(&self) -> f32;
    fn damage_reduction(&self) -> f32;
    fn movement_speed_multiplier(&self) -> f32;

    fn is_dead(&self) -> bool {
        self.current_health() <= 0.0
    }
}

/// Built-in player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    current_health: f32,
    max_health: f32,
    /// Fraction in `[0, DAMAGE_REDUCTION_CAP]`.
    damage_reduction: f32,
    movement_speed_multiplier: f32,
}

impl PlayerState {
    pub fn new(max_health: f32) -> Self {
        Self {
            current_health: max_health,
            max_health,
            damage_reduction: 0.0,
            movement_speed_multiplier: 1.0,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl PlayerStats for PlayerState {
    fn heal_to_full(&mut self) {
        self.current_health = self.max_health;
        log::debug!("Player healed to full: {:.0}", self.max_health);
    }

    /// Raises the maximum and heals by the same amount.
    fn increase_max_health(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        self.max_health += amount;
        self.current_health = (self.current_health + amount).min(self.max_health);
        log::debug!(
            "Player max health +{:.0}: {:.0}/{:.0}",
            amount,
            self.current_health,
            self.max_health
        );
    }

    fn increase_damage_reduction(&mut self, pct: f32) -> bool {
        if pct <= 0.0 {
            return false;
        }
        if self.is_damage_reduction_capped() {
            log::info!(
                "Damage reduction already at cap ({:.0}%), increase rejected",
                DAMAGE_REDUCTION_CAP * 100.0
            );
            return false;
        }
        self.damage_reduction = (self.damage_reduction + pct).min(DAMAGE_REDUCTION_CAP);
        log::debug!("Damage reduction now {:.0}%", self.damage_reduction * 100.0);
        true
    }

    fn increase_movement_speed(&mut self, pct: f32) {
        if pct <= 0.0 {
            return;
        }
        self.movement_speed_multiplier += pct;
    }

    fn is_damage_reduction_capped(&self) -> bool {
        self.damage_reduction >= DAMAGE_REDUCTION_CAP
    }

    fn take_damage(&mut self, amount: f32) -> f32 {
        if self.is_dead() || amount <= 0.0 {
            return 0.0;
        }
        let reduced = amount * (1.0 - self.damage_reduction);
        let lost = reduced.min(self.current_health);
        self.current_health -= lost;
        lost
    }

    fn current_health(&self) -> f32 {
        self.current_health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn damage_reduction(&self) -> f32 {
        self.damage_reduction
    }

    fn movement_speed_multiplier(&self) -> f32 {
        self.movement_speed_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_reduction_never_exceeds_cap() {
        let mut player = PlayerState::default();
        for _ in 0..100 {
            player.increase_damage_reduction(0.15);
        }
        assert!(player.damage_reduction() <= DAMAGE_REDUCTION_CAP);
        assert!(player.is_damage_reduction_capped());
    }

    #[test]
    fn test_increase_rejected_once_capped() {
        let mut player = PlayerState::default();
        assert!(player.increase_damage_reduction(0.45));
        // Partial headroom: applied and clamped to the cap.
        assert!(player.increase_damage_reduction(0.15));
        assert_eq!(player.damage_reduction(), DAMAGE_REDUCTION_CAP);
        assert!(!player.increase_damage_reduction(0.05));
        assert!(!player.increase_damage_reduction(0.0));
    }

    #[test]
    fn test_max_health_increase_heals() {
        let mut player = PlayerState::new(100.0);
        player.take_damage(50.0);
        player.increase_max_health(20.0);
        assert_eq!(player.max_health(), 120.0);
        assert_eq!(player.current_health(), 70.0);

        let mut full = PlayerState::new(100.0);
        full.increase_max_health(10.0);
        assert_eq!(full.current_health(), full.max_health());
    }

    #[test]
    fn test_take_damage_applies_reduction() {
        let mut player = PlayerState::new(100.0);
        player.increase_damage_reduction(0.25);
        let lost = player.take_damage(40.0);
        assert!((lost - 30.0).abs() < 1e-4);
        assert!((player.current_health() - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_death_and_no_damage_after() {
        let mut player = PlayerState::new(10.0);
        assert_eq!(player.take_damage(25.0), 10.0);
        assert!(player.is_dead());
        assert_eq!(player.take_damage(5.0), 0.0);
        assert_eq!(player.current_health(), 0.0);
    }

    #[test]
    fn test_heal_to_full() {
        let mut player = PlayerState::new(100.0);
        player.take_damage(99.0);
        player.heal_to_full();
        assert_eq!(player.current_health(), 100.0);
    }

    #[test]
    fn test_movement_speed_is_additive() {
        let mut player = PlayerState::default();
        player.increase_movement_speed(0.1);
        player.increase_movement_speed(0.2);
        player.increase_movement_speed(-1.0);
        assert!((player.movement_speed_multiplier() - 1.3).abs() < 1e-6);
    }
}
