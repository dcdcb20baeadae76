//! Wave spawning contract.
//!
//! The spawner owns enemy lifecycles. The progression engine only sees the
//! [`EnemyEntity`] snapshots it hands back for each wave.

use serde::{Deserialize, Serialize};

/// Stable identity of a spawned enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Health snapshot of one enemy at the moment it joins a wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyEntity {
    pub id: EnemyId,
    pub max_health: f32,
    pub current_health: f32,
}

impl EnemyEntity {
    /// A fresh enemy at full health.
    pub fn new(id: EnemyId, max_health: f32) -> Self {
        Self {
            id,
            max_health,
            current_health: max_health,
        }
    }
}

/// Produces the enemies for a round.
pub trait Spawner {
    /// Spawn `count` enemies. Implementations never return an empty wave for
    /// a non-zero count.
    fn spawn_wave(&mut self, count: u32) -> Vec<EnemyEntity>;
}

/// Spawns identical enemies with sequential ids.
#[derive(Debug, Clone)]
pub struct UniformSpawner {
    pub max_health: f32,
    next_id: u32,
}

impl UniformSpawner {
    pub fn new(max_health: f32) -> Self {
        Self {
            max_health,
            next_id: 0,
        }
    }
}

impl Spawner for UniformSpawner {
    fn spawn_wave(&mut self, count: u32) -> Vec<EnemyEntity> {
        (0..count)
            .map(|_| {
                let id = EnemyId(self.next_id);
                self.next_id += 1;
                EnemyEntity::new(id, self.max_health)
            })
            .collect()
    }
}
