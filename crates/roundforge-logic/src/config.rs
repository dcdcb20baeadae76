//! Tunable progression parameters.
//!
//! Loaded from JSON by the harness (or any host), with every field optional:
//!
//! ```
//! use roundforge_logic::config::ProgressionConfig;
//!
//! let config = ProgressionConfig::from_json(r#"{ "initial_enemy_count": 3 }"#).unwrap();
//! assert_eq!(config.initial_enemy_count, 3);
//! assert_eq!(config.enemy_count_step, 5);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::round::PICKS_PER_ROUND;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Enemies in the first wave.
    pub initial_enemy_count: u32,
    /// Extra enemies added to each following wave.
    pub enemy_count_step: u32,
    /// Max health of each spawned enemy.
    pub enemy_max_health: f32,
    /// Player max health at the start of a run.
    pub player_max_health: f32,
    /// How long the round start/end banners stay up.
    pub banner_secs: f32,
    /// Pause between the last pick and the next round.
    pub phase_exit_delay_secs: f32,
    /// Upgrades picked at the end of each round.
    pub picks_per_round: u8,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            initial_enemy_count: 5,
            enemy_count_step: 5,
            enemy_max_health: 100.0,
            player_max_health: 100.0,
            banner_secs: 3.0,
            phase_exit_delay_secs: 1.5,
            picks_per_round: PICKS_PER_ROUND,
        }
    }
}

impl ProgressionConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }
        Ok(config)
    }

    /// Every problem with this config; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.initial_enemy_count == 0 {
            issues.push("initial_enemy_count must be at least 1".to_string());
        }
        if !(self.enemy_max_health > 0.0) {
            issues.push(format!(
                "enemy_max_health must be positive (got {})",
                self.enemy_max_health
            ));
        }
        if !(self.player_max_health > 0.0) {
            issues.push(format!(
                "player_max_health must be positive (got {})",
                self.player_max_health
            ));
        }
        if !(self.banner_secs >= 0.0) {
            issues.push("banner_secs must not be negative".to_string());
        }
        if !(self.phase_exit_delay_secs >= 0.0) {
            issues.push("phase_exit_delay_secs must not be negative".to_string());
        }
        if self.picks_per_round == 0 {
            issues.push("picks_per_round must be at least 1".to_string());
        }
        issues
    }

    /// Wave size for 1-based `round`.
    pub fn enemy_count_for_round(&self, round: u32) -> u32 {
        self.initial_enemy_count
            .saturating_add(round.saturating_sub(1).saturating_mul(self.enemy_count_step))
    }
}
