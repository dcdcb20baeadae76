//! Aggregate enemy health for the current wave.
//!
//! The tracker keeps identity + last-known health for every enemy in the wave
//! (never the enemies themselves) and decides when the wave is cleared. The
//! `WaveCleared` signal is latched so it fires at most once per registered
//! wave, no matter how many duplicate death or damage reports arrive.

use serde::{Deserialize, Serialize};

use crate::spawner::{EnemyEntity, EnemyId};

/// Unattributed damage within this much of the wave's remaining health
/// clears it. Attributed damage and deaths never use it.
const UNATTRIBUTED_EPSILON: f64 = 1e-3;

/// Signal that every enemy in a wave is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveCleared {
    /// 1-based count of waves registered with this tracker.
    pub wave: u32,
}

/// Totals for the current wave.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaveAggregate {
    pub total_health: f32,
    pub current_health: f32,
    pub enemies_remaining: u32,
}

#[derive(Debug, Clone, Copy)]
struct TrackedEnemy {
    id: EnemyId,
    health: f32,
    alive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WaveHealthTracker {
    aggregate: WaveAggregate,
    roster: Vec<TrackedEnemy>,
    /// Damage not tied to an enemy since the last death. Kept in f64 so many
    /// small hits do not drift short of the total.
    unattributed: f64,
    wave: u32,
    cleared: bool,
}

impl WaveHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked wave with `enemies`.
    ///
    /// An empty slice is ignored; the previous aggregate stays in place.
    pub fn register_wave(&mut self, enemies: &[EnemyEntity]) {
        if enemies.is_empty() {
            log::warn!("register_wave called with an empty wave, ignoring");
            return;
        }

        self.roster = enemies
            .iter()
            .map(|e| TrackedEnemy {
                id: e.id,
                health: e.current_health.clamp(0.0, e.max_health),
                alive: true,
            })
            .collect();

        self.aggregate = WaveAggregate {
            total_health: enemies.iter().map(|e| e.max_health).sum(),
            current_health: self.roster.iter().map(|e| e.health).sum(),
            enemies_remaining: enemies.len() as u32,
        };
        self.unattributed = 0.0;
        self.wave += 1;
        self.cleared = false;

        log::info!(
            "Wave {} registered: {} enemies, {:.0}/{:.0} health",
            self.wave,
            self.aggregate.enemies_remaining,
            self.aggregate.current_health,
            self.aggregate.total_health
        );
    }

    /// Subtract `amount` from the aggregate without attributing it to an enemy.
    ///
    /// The roster is untouched, so the next death report reconciles the
    /// aggregate back to the survivors' last-known health.
    pub fn report_damage(&mut self, amount: f32) -> Option<WaveCleared> {
        if !self.is_tracking() {
            return None;
        }
        self.unattributed += f64::from(amount.max(0.0));
        self.refresh_current();
        self.check_cleared()
    }

    /// Damage a specific enemy. Only the health it actually loses counts
    /// against the aggregate.
    pub fn report_enemy_damage(&mut self, id: EnemyId, amount: f32) -> Option<WaveCleared> {
        let Some(enemy) = self.roster.iter_mut().find(|e| e.id == id && e.alive) else {
            log::debug!("damage report for untracked or dead enemy {:?}", id);
            return None;
        };
        enemy.health = (enemy.health - amount.max(0.0)).max(0.0);
        self.refresh_current();
        self.check_cleared()
    }

    /// Record an enemy death.
    ///
    /// Current health is rebuilt from the surviving enemies' last-known
    /// health rather than trusting the running total.
    pub fn report_death(&mut self, id: EnemyId) -> Option<WaveCleared> {
        match self.roster.iter_mut().find(|e| e.id == id) {
            Some(enemy) if enemy.alive => {
                enemy.alive = false;
                enemy.health = 0.0;
                self.aggregate.enemies_remaining =
                    self.aggregate.enemies_remaining.saturating_sub(1);
            }
            Some(_) => {
                log::warn!("duplicate death report for enemy {:?}", id);
                return None;
            }
            None => {
                log::warn!("death report for enemy {:?} not in wave {}", id, self.wave);
                return None;
            }
        }

        self.unattributed = 0.0;
        self.refresh_current();
        self.check_cleared()
    }

    fn survivor_health(&self) -> f64 {
        self.roster
            .iter()
            .filter(|e| e.alive)
            .map(|e| f64::from(e.health))
            .sum()
    }

    /// Recompute current health as survivors minus unattributed damage.
    ///
    /// Snaps to 0 only when unattributed damage is within
    /// [`UNATTRIBUTED_EPSILON`] of the survivors' health; with none pending,
    /// 0 means every survivor is at exactly 0.
    fn refresh_current(&mut self) {
        let survivors = self.survivor_health();
        let mut remaining = survivors - self.unattributed;
        if self.unattributed > 0.0 && remaining <= UNATTRIBUTED_EPSILON {
            remaining = 0.0;
        }
        self.aggregate.current_health =
            (remaining.max(0.0) as f32).min(self.aggregate.total_health);
    }

    fn check_cleared(&mut self) -> Option<WaveCleared> {
        let done =
            self.aggregate.current_health <= 0.0 || self.aggregate.enemies_remaining == 0;
        if !done || self.cleared {
            return None;
        }
        self.aggregate.current_health = 0.0;
        self.cleared = true;
        log::info!("Wave {} cleared", self.wave);
        Some(WaveCleared { wave: self.wave })
    }

    fn is_tracking(&self) -> bool {
        self.wave > 0
    }

    pub fn aggregate(&self) -> WaveAggregate {
        self.aggregate
    }

    pub fn current_health(&self) -> f32 {
        self.aggregate.current_health
    }

    pub fn total_health(&self) -> f32 {
        self.aggregate.total_health
    }

    pub fn enemies_remaining(&self) -> u32 {
        self.aggregate.enemies_remaining
    }

    /// Number of waves registered so far.
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Fraction of wave health left, for the health bar.
    pub fn health_ratio(&self) -> f32 {
        if self.aggregate.total_health > 0.0 {
            self.aggregate.current_health / self.aggregate.total_health
        } else {
            0.0
        }
    }

    /// Health bar text, e.g. `"80/100"`.
    pub fn health_label(&self) -> String {
        format!(
            "{}/{}",
            self.aggregate.current_health.round() as i64,
            self.aggregate.total_health.round() as i64
        )
    }

    pub fn is_bar_visible(&self) -> bool {
        self.aggregate.current_health > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_of(healths: &[f32]) -> Vec<EnemyEntity> {
        healths
            .iter()
            .enumerate()
            .map(|(i, h)| EnemyEntity::new(EnemyId(i as u32), *h))
            .collect()
    }

    #[test]
    fn test_register_wave_totals() {
        let mut tracker = WaveHealthTracker::new();
        let mut enemies = wave_of(&[100.0, 50.0]);
        enemies[1].current_health = 20.0;
        tracker.register_wave(&enemies);
        assert_eq!(tracker.total_health(), 150.0);
        assert_eq!(tracker.current_health(), 120.0);
        assert_eq!(tracker.enemies_remaining(), 2);
        assert_eq!(tracker.wave(), 1);
    }

    #[test]
    fn test_empty_wave_is_noop() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&[]);
        assert_eq!(tracker.wave(), 0);
        assert!(tracker.report_damage(10.0).is_none());

        tracker.register_wave(&wave_of(&[10.0]));
        tracker.register_wave(&[]);
        assert_eq!(tracker.wave(), 1);
        assert_eq!(tracker.total_health(), 10.0);
    }

    #[test]
    fn test_damage_clamps_and_clears_once() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[100.0, 100.0]));
        assert!(tracker.report_damage(-5.0).is_none());
        assert_eq!(tracker.current_health(), 200.0);
        assert!(tracker.report_damage(150.0).is_none());
        assert_eq!(
            tracker.report_damage(500.0),
            Some(WaveCleared { wave: 1 })
        );
        assert_eq!(tracker.current_health(), 0.0);
        assert!(tracker.report_damage(1.0).is_none());
    }

    #[test]
    fn test_many_small_hits_reach_exact_zero() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[100.0]));
        let mut fired = 0;
        for _ in 0..1000 {
            if tracker.report_damage(0.1).is_some() {
                fired += 1;
            }
        }
        assert_eq!(tracker.current_health(), 0.0);
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_three_enemy_scenario() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[100.0, 100.0, 100.0]));
        assert!(tracker.report_damage(250.0).is_none());
        assert_eq!(tracker.current_health(), 50.0);

        let mut fired = 0;
        for id in 0..3 {
            if tracker.report_death(EnemyId(id)).is_some() {
                fired += 1;
            }
        }
        assert_eq!(tracker.current_health(), 0.0);
        assert_eq!(tracker.enemies_remaining(), 0);
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_duplicate_death_is_idempotent() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[10.0]));
        assert!(tracker.report_death(EnemyId(0)).is_some());
        assert!(tracker.report_death(EnemyId(0)).is_none());
        assert!(tracker.report_death(EnemyId(99)).is_none());
        assert_eq!(tracker.enemies_remaining(), 0);
    }

    #[test]
    fn test_death_recomputes_from_survivors() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[100.0, 100.0]));
        tracker.report_enemy_damage(EnemyId(0), 30.0);
        tracker.report_enemy_damage(EnemyId(1), 40.0);
        assert_eq!(tracker.current_health(), 130.0);
        // Enemy 0 dies with 70 health left on the books.
        assert!(tracker.report_death(EnemyId(0)).is_none());
        assert_eq!(tracker.current_health(), 60.0);
        assert_eq!(tracker.enemies_remaining(), 1);
    }

    #[test]
    fn test_overkill_counts_only_remaining_health() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[50.0, 50.0]));
        tracker.report_enemy_damage(EnemyId(0), 500.0);
        assert_eq!(tracker.current_health(), 50.0);
        assert!(tracker.report_enemy_damage(EnemyId(1), 60.0).is_some());
    }

    #[test]
    fn test_large_wave_survivor_keeps_wave_open() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[100.0; 500]));
        for id in 0..499 {
            assert!(tracker.report_death(EnemyId(id)).is_none());
        }
        assert!(tracker.report_enemy_damage(EnemyId(499), 96.0).is_none());
        assert_eq!(tracker.enemies_remaining(), 1);
        assert!((tracker.current_health() - 4.0).abs() < 1e-4);
        assert!(tracker.is_bar_visible());

        assert_eq!(
            tracker.report_enemy_damage(EnemyId(499), 4.0),
            Some(WaveCleared { wave: 1 })
        );
        assert_eq!(tracker.current_health(), 0.0);
    }

    #[test]
    fn test_tiny_survivor_health_is_not_rounded_away() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[1000.0, 1000.0]));
        tracker.report_enemy_damage(EnemyId(0), 1000.0);
        assert!(tracker.report_enemy_damage(EnemyId(1), 999.99).is_none());
        assert!(tracker.current_health() > 0.0);
    }

    #[test]
    fn test_new_wave_rearms_latch() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[10.0]));
        assert!(tracker.report_death(EnemyId(0)).is_some());
        tracker.register_wave(&[EnemyEntity::new(EnemyId(1), 10.0)]);
        assert!(!tracker.is_cleared());
        assert_eq!(
            tracker.report_death(EnemyId(1)),
            Some(WaveCleared { wave: 2 })
        );
    }

    #[test]
    fn test_health_bar_helpers() {
        let mut tracker = WaveHealthTracker::new();
        tracker.register_wave(&wave_of(&[60.0, 40.0]));
        tracker.report_damage(20.0);
        assert_eq!(tracker.health_label(), "80/100");
        assert!((tracker.health_ratio() - 0.8).abs() < 1e-6);
        assert!(tracker.is_bar_visible());
        tracker.report_damage(80.0);
        assert!(!tracker.is_bar_visible());
        assert_eq!(tracker.health_ratio(), 0.0);
    }
}
