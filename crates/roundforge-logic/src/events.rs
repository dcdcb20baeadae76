//! Events emitted for the presentation layer.
//!
//! The round controller appends to an outbox; the host drains it once per
//! frame and renders banners, slot text, colors, and health bars from it.

use serde::{Deserialize, Serialize};

use crate::catalog::{Rarity, UpgradeType};
use crate::selection::SlotView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Banner {
    RoundStart,
    RoundEnd,
}

/// Result of applying one upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeOutcome {
    Applied,
    /// Damage reduction was already at its cap.
    RejectedAtCap,
    /// No collaborator to apply it to.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted {
        round: u32,
        enemy_count: u32,
    },
    WaveCleared {
        round: u32,
    },
    PhaseBegan {
        round: u32,
        picks_allowed: u8,
        instruction: String,
        slots: Vec<SlotView>,
    },
    UpgradeApplied {
        upgrade_id: String,
        kind: UpgradeType,
        rarity: Rarity,
        value: f32,
        outcome: UpgradeOutcome,
    },
    PickMade {
        slot_index: usize,
        remaining: u8,
        instruction: String,
    },
    PhaseComplete {
        round: u32,
    },
    ModifiersBroadcast {
        damage_multiplier: f32,
        fire_rate_multiplier: f32,
        weapons_updated: usize,
    },
    BannerHidden(Banner),
    PlayerDamaged {
        amount: f32,
        health: f32,
    },
    PlayerDied {
        round: u32,
    },
}

impl GameEvent {
    /// Short name for logs and harness output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoundStarted { .. } => "RoundStarted",
            Self::WaveCleared { .. } => "WaveCleared",
            Self::PhaseBegan { .. } => "PhaseBegan",
            Self::UpgradeApplied { .. } => "UpgradeApplied",
            Self::PickMade { .. } => "PickMade",
            Self::PhaseComplete { .. } => "PhaseComplete",
            Self::ModifiersBroadcast { .. } => "ModifiersBroadcast",
            Self::BannerHidden(_) => "BannerHidden",
            Self::PlayerDamaged { .. } => "PlayerDamaged",
            Self::PlayerDied { .. } => "PlayerDied",
        }
    }
}
