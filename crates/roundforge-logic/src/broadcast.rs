//! Global weapon modifiers and their propagation to every registered weapon.
//!
//! Weapons register explicitly when they are created or equipped and receive
//! the current multipliers on every broadcast. The modifiers themselves can
//! only be changed inside this crate; the round controller is the one writer.

use serde::{Deserialize, Serialize};

use crate::weapon::Weapon;

/// Process-wide multipliers applied to every weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalPlayerModifiers {
    damage_multiplier: f32,
    fire_rate_multiplier: f32,
}

impl GlobalPlayerModifiers {
    pub fn new() -> Self {
        Self {
            damage_multiplier: 1.0,
            fire_rate_multiplier: 1.0,
        }
    }

    pub fn damage_multiplier(&self) -> f32 {
        self.damage_multiplier
    }

    pub fn fire_rate_multiplier(&self) -> f32 {
        self.fire_rate_multiplier
    }

    /// `percent` is whole-number percent, e.g. 10 for +10%.
    pub(crate) fn add_damage_percent(&mut self, percent: f32) {
        self.damage_multiplier += percent.max(0.0) / 100.0;
    }

    pub(crate) fn add_fire_rate_percent(&mut self, percent: f32) {
        self.fire_rate_multiplier += percent.max(0.0) / 100.0;
    }
}

impl Default for GlobalPlayerModifiers {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`StatBroadcaster::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub u32);

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub updated: usize,
    /// Weapons that left the registry before their turn came.
    pub skipped: usize,
}

/// Registry of active weapons.
#[derive(Default)]
pub struct StatBroadcaster {
    weapons: Vec<(WeaponId, Box<dyn Weapon>)>,
    next_id: u32,
}

impl StatBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, weapon: Box<dyn Weapon>) -> WeaponId {
        let id = WeaponId(self.next_id);
        self.next_id += 1;
        log::debug!("Registered weapon {} as {:?}", weapon.name(), id);
        self.weapons.push((id, weapon));
        id
    }

    /// Remove a weapon, handing it back to the caller.
    pub fn unregister(&mut self, id: WeaponId) -> Option<Box<dyn Weapon>> {
        let index = self.weapons.iter().position(|(wid, _)| *wid == id)?;
        let (_, weapon) = self.weapons.remove(index);
        log::debug!("Unregistered weapon {} ({:?})", weapon.name(), id);
        Some(weapon)
    }

    pub fn get(&self, id: WeaponId) -> Option<&dyn Weapon> {
        self.weapons
            .iter()
            .find(|(wid, _)| *wid == id)
            .map(|(_, w)| w.as_ref())
    }

    pub fn ids(&self) -> Vec<WeaponId> {
        self.weapons.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Push `modifiers` to every registered weapon.
    pub fn broadcast(&mut self, modifiers: &GlobalPlayerModifiers) -> BroadcastReport {
        let ids = self.ids();
        self.broadcast_to(&ids, modifiers)
    }

    /// Push `modifiers` to the weapons in `ids`. Ids that are no longer
    /// registered are skipped.
    pub fn broadcast_to(
        &mut self,
        ids: &[WeaponId],
        modifiers: &GlobalPlayerModifiers,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for id in ids {
            match self.weapons.iter_mut().find(|(wid, _)| wid == id) {
                Some((_, weapon)) => {
                    weapon.update_stats_from_global(
                        modifiers.damage_multiplier(),
                        modifiers.fire_rate_multiplier(),
                    );
                    report.updated += 1;
                }
                None => report.skipped += 1,
            }
        }
        log::info!(
            "Broadcast damage x{:.2}, fire rate x{:.2} to {} weapons ({} skipped)",
            modifiers.damage_multiplier(),
            modifiers.fire_rate_multiplier(),
            report.updated,
            report.skipped
        );
        report
    }
}

impl std::fmt::Debug for StatBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatBroadcaster")
            .field(
                "weapons",
                &self
                    .weapons
                    .iter()
                    .map(|(id, w)| (id.0, w.name().to_string()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::{GunStats, MIN_FIRE_COOLDOWN};

    #[test]
    fn test_modifiers_start_at_one_and_add_percent() {
        let mut m = GlobalPlayerModifiers::new();
        assert_eq!(m.damage_multiplier(), 1.0);
        assert_eq!(m.fire_rate_multiplier(), 1.0);
        m.add_damage_percent(10.0);
        m.add_damage_percent(20.0);
        m.add_fire_rate_percent(-50.0);
        assert!((m.damage_multiplier() - 1.3).abs() < 1e-6);
        assert_eq!(m.fire_rate_multiplier(), 1.0);
    }

    #[test]
    fn test_broadcast_reaches_every_weapon() {
        let mut broadcaster = StatBroadcaster::new();
        let pistol = broadcaster.register(Box::new(GunStats::pistol()));
        let rifle = broadcaster.register(Box::new(GunStats::new("Rifle", 20.0, 0.1)));

        let mut m = GlobalPlayerModifiers::new();
        m.add_damage_percent(30.0);
        m.add_fire_rate_percent(100.0);
        let report = broadcaster.broadcast(&m);
        assert_eq!(report, BroadcastReport { updated: 2, skipped: 0 });

        let p = broadcaster.get(pistol).unwrap();
        assert!((p.current_damage() - 13.0).abs() < 1e-4);
        assert!((p.current_cooldown() - 0.125).abs() < 1e-6);
        let r = broadcaster.get(rifle).unwrap();
        assert!((r.current_damage() - 26.0).abs() < 1e-4);
    }

    #[test]
    fn test_unregistered_weapon_is_skipped() {
        let mut broadcaster = StatBroadcaster::new();
        let a = broadcaster.register(Box::new(GunStats::pistol()));
        let b = broadcaster.register(Box::new(GunStats::rifle()));
        let snapshot = broadcaster.ids();

        let removed = broadcaster.unregister(a).unwrap();
        assert_eq!(removed.name(), "Pistol");
        assert!(broadcaster.unregister(a).is_none());

        let report = broadcaster.broadcast_to(&snapshot, &GlobalPlayerModifiers::new());
        assert_eq!(report, BroadcastReport { updated: 1, skipped: 1 });
        assert!(broadcaster.get(b).is_some());
        assert_eq!(broadcaster.len(), 1);
    }

    #[test]
    fn test_fire_rate_floor_through_broadcast() {
        let mut broadcaster = StatBroadcaster::new();
        let id = broadcaster.register(Box::new(GunStats::pistol()));
        let mut m = GlobalPlayerModifiers::new();
        m.add_fire_rate_percent(10_000.0);
        broadcaster.broadcast(&m);
        assert_eq!(broadcaster.get(id).unwrap().current_cooldown(), MIN_FIRE_COOLDOWN);
    }

    #[test]
    fn test_empty_broadcast() {
        let mut broadcaster = StatBroadcaster::new();
        assert!(broadcaster.is_empty());
        let report = broadcaster.broadcast(&GlobalPlayerModifiers::new());
        assert_eq!(report, BroadcastReport::default());
    }
}
