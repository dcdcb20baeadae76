//! Round lifecycle state machine.
//!
//! ```text
//! Boot ──start──▶ RoundActive ──wave cleared──▶ RoundEnding ──▶ UpgradePhase
//!                      ▲                                            │
//!                      └──────── picks done + delay ────────────────┘
//! ```
//!
//! The controller owns every piece of progression state: the round counter,
//! the global weapon modifiers, the wave tracker, and the selection station.
//! Collaborators (spawner, player, weapons) are bound explicitly. Delays are
//! scheduled continuations tagged with the current [`Generation`]; anything
//! that comes due after the state has moved on is dropped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::broadcast::{GlobalPlayerModifiers, StatBroadcaster, WeaponId};
use crate::catalog::{UpgradeCatalog, UpgradeRoll, UpgradeType};
use crate::config::ProgressionConfig;
use crate::error::RoundError;
use crate::events::{Banner, GameEvent, UpgradeOutcome};
use crate::player::{PlayerState, PlayerStats};
use crate::schedule::{Generation, Scheduler};
use crate::selection::{Pick, SelectionPhase, SelectionStation};
use crate::spawner::{EnemyId, Spawner, UniformSpawner};
use crate::wave::{WaveCleared, WaveHealthTracker};
use crate::weapon::Weapon;

/// Default number of upgrades picked at the end of every round.
pub const PICKS_PER_ROUND: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundState {
    Boot,
    RoundActive,
    RoundEnding,
    UpgradePhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 0 before the first round starts.
    pub index: u32,
    pub enemy_count_for_wave: u32,
    pub upgrade_picks_allowed: u8,
}

/// Banner visibility the presentation layer mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Banners {
    pub round_start: bool,
    pub round_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    HideBanner(Banner),
    /// Leave the upgrade phase and start the next round.
    FinishUpgradePhase,
}

pub struct RoundController<R: Rng = StdRng> {
    config: ProgressionConfig,
    state: RoundState,
    generation: Generation,
    round: Round,
    modifiers: GlobalPlayerModifiers,
    catalog: UpgradeCatalog,
    tracker: WaveHealthTracker,
    station: SelectionStation,
    broadcaster: StatBroadcaster,
    scheduler: Scheduler<Continuation>,
    banners: Banners,
    spawner: Option<Box<dyn Spawner>>,
    player: Option<Box<dyn PlayerStats>>,
    rng: R,
    events: Vec<GameEvent>,
}

impl RoundController<StdRng> {
    /// Controller with the built-in spawner and player, seeded for
    /// reproducible rolls.
    pub fn seeded(config: ProgressionConfig, seed: u64) -> Self {
        Self::with_defaults(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RoundController<R> {
    /// Bare controller. A spawner and a player must be bound before the
    /// first round can start.
    pub fn new(config: ProgressionConfig, rng: R) -> Self {
        let picks = config.picks_per_round;
        Self {
            config,
            state: RoundState::Boot,
            generation: Generation::default(),
            round: Round {
                index: 0,
                enemy_count_for_wave: 0,
                upgrade_picks_allowed: picks,
            },
            modifiers: GlobalPlayerModifiers::new(),
            catalog: UpgradeCatalog::standard(),
            tracker: WaveHealthTracker::new(),
            station: SelectionStation::new(),
            broadcaster: StatBroadcaster::new(),
            scheduler: Scheduler::new(),
            banners: Banners::default(),
            spawner: None,
            player: None,
            rng,
            events: Vec::new(),
        }
    }

    /// Controller with [`UniformSpawner`] and [`PlayerState`] bound from
    /// `config`.
    pub fn with_defaults(config: ProgressionConfig, rng: R) -> Self {
        let spawner = UniformSpawner::new(config.enemy_max_health);
        let player = PlayerState::new(config.player_max_health);
        let mut controller = Self::new(config, rng);
        controller.bind_spawner(Box::new(spawner));
        controller.bind_player(Box::new(player));
        controller
    }

    /// Replace the standard upgrade catalog.
    pub fn with_catalog(mut self, catalog: UpgradeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn bind_spawner(&mut self, spawner: Box<dyn Spawner>) {
        self.spawner = Some(spawner);
    }

    pub fn bind_player(&mut self, player: Box<dyn PlayerStats>) {
        self.player = Some(player);
    }

    /// Register a weapon and bring it up to the current modifiers.
    pub fn register_weapon(&mut self, weapon: Box<dyn Weapon>) -> WeaponId {
        let id = self.broadcaster.register(weapon);
        self.broadcaster.broadcast_to(&[id], &self.modifiers);
        id
    }

    pub fn unregister_weapon(&mut self, id: WeaponId) -> Option<Box<dyn Weapon>> {
        self.broadcaster.unregister(id)
    }

    // ── Transitions ────────────────────────────────────────────────────

    fn transition(&mut self, next: RoundState) {
        log::debug!("Round state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.generation = self.generation.next();
        let dropped = self.scheduler.cancel_stale(self.generation);
        if dropped > 0 {
            log::debug!("Cancelled {} stale continuations", dropped);
        }
    }

    /// Start the next round: spawn a larger wave and begin tracking it.
    ///
    /// Valid from Boot, or from UpgradePhase once every pick has been made.
    pub fn start_next_round(&mut self) -> Result<u32, RoundError> {
        let ready = match self.state {
            RoundState::Boot => true,
            RoundState::UpgradePhase => self.station.phase() == SelectionPhase::Complete,
            RoundState::RoundActive | RoundState::RoundEnding => false,
        };
        if !ready {
            log::warn!("start_next_round rejected in state {:?}", self.state);
            return Err(RoundError::InvalidTransition {
                action: "start the next round",
                state: self.state,
            });
        }
        if self.player.is_none() {
            log::error!("Cannot start a round: no player bound");
            return Err(RoundError::MissingCollaborator("player"));
        }
        let Some(spawner) = self.spawner.as_mut() else {
            log::error!("Cannot start a round: no spawner bound");
            return Err(RoundError::MissingCollaborator("spawner"));
        };

        let index = self.round.index + 1;
        let enemy_count = self.config.enemy_count_for_round(index);
        let enemies = spawner.spawn_wave(enemy_count);
        if enemies.is_empty() {
            log::error!("Spawner returned no enemies for round {}", index);
            return Err(RoundError::EmptyWave { round: index });
        }

        if self.state == RoundState::Boot {
            // Weapons registered before the first round still need the
            // starting multipliers.
            self.broadcast_modifiers();
        }
        self.station.finish_phase();

        self.tracker.register_wave(&enemies);
        self.round = Round {
            index,
            enemy_count_for_wave: enemies.len() as u32,
            upgrade_picks_allowed: self.config.picks_per_round,
        };
        self.transition(RoundState::RoundActive);

        self.banners = Banners {
            round_start: true,
            round_end: false,
        };
        self.scheduler.schedule(
            self.config.banner_secs,
            self.generation,
            Continuation::HideBanner(Banner::RoundStart),
        );

        log::info!("Starting round {} with {} enemies", index, enemies.len());
        self.events.push(GameEvent::RoundStarted {
            round: index,
            enemy_count: enemies.len() as u32,
        });
        Ok(index)
    }

    /// Close the active round and open the upgrade phase.
    ///
    /// Only valid while a round is active; repeated calls are rejected.
    pub fn end_round(&mut self) -> Result<(), RoundError> {
        if self.state != RoundState::RoundActive {
            log::warn!(
                "end_round called in state {:?}, upgrade phase already underway",
                self.state
            );
            return Err(RoundError::InvalidTransition {
                action: "end the round",
                state: self.state,
            });
        }

        log::info!("Round {} ended", self.round.index);
        self.transition(RoundState::RoundEnding);
        self.events.push(GameEvent::WaveCleared {
            round: self.round.index,
        });

        let capped = self
            .player
            .as_ref()
            .is_some_and(|p| p.is_damage_reduction_capped());
        let began = self.station.begin_phase(
            self.round.upgrade_picks_allowed,
            capped,
            &self.catalog,
            &mut self.rng,
        );

        self.transition(RoundState::UpgradePhase);
        self.banners = Banners {
            round_start: false,
            round_end: true,
        };
        self.scheduler.schedule(
            self.config.banner_secs,
            self.generation,
            Continuation::HideBanner(Banner::RoundEnd),
        );

        let slots = match began {
            Ok(slots) => slots,
            Err(e) => {
                // No choices to offer: close the phase and move on.
                log::error!("Upgrade phase for round {} skipped: {}", self.round.index, e);
                self.station.abandon_phase();
                self.schedule_phase_exit();
                self.station.slot_views()
            }
        };
        self.events.push(GameEvent::PhaseBegan {
            round: self.round.index,
            picks_allowed: self.station.picks_allowed(),
            instruction: self.station.instruction_text(),
            slots,
        });
        if self.station.phase() == SelectionPhase::Complete {
            self.events.push(GameEvent::PhaseComplete {
                round: self.round.index,
            });
        }
        Ok(())
    }

    fn schedule_phase_exit(&mut self) {
        self.scheduler.schedule(
            self.config.phase_exit_delay_secs,
            self.generation,
            Continuation::FinishUpgradePhase,
        );
    }

    fn on_wave_cleared(&mut self, cleared: WaveCleared) {
        log::debug!("Wave {} cleared during round {}", cleared.wave, self.round.index);
        if let Err(e) = self.end_round() {
            log::warn!("Ignoring wave-cleared signal: {}", e);
        }
    }

    // ── Inputs ─────────────────────────────────────────────────────────

    /// An enemy took damage.
    pub fn report_enemy_damage(&mut self, id: EnemyId, amount: f32) -> Option<WaveCleared> {
        let cleared = self.tracker.report_enemy_damage(id, amount)?;
        self.on_wave_cleared(cleared);
        Some(cleared)
    }

    /// Damage not attributed to a specific enemy.
    pub fn report_damage(&mut self, amount: f32) -> Option<WaveCleared> {
        let cleared = self.tracker.report_damage(amount)?;
        self.on_wave_cleared(cleared);
        Some(cleared)
    }

    /// An enemy died. Must be reported once, before it is despawned.
    pub fn report_enemy_death(&mut self, id: EnemyId) -> Option<WaveCleared> {
        let cleared = self.tracker.report_death(id)?;
        self.on_wave_cleared(cleared);
        Some(cleared)
    }

    /// The player shot an upgrade slot.
    ///
    /// Applies the upgrade at most once per slot; anything else is a no-op.
    pub fn player_shot_slot(&mut self, slot_index: usize) -> Option<Pick> {
        if self.state != RoundState::UpgradePhase || !self.station.can_make_pick() {
            log::debug!("Slot {} shot while no pick is open", slot_index);
            return None;
        }
        let pick = match self.station.attempt_select(slot_index) {
            Ok(pick) => pick,
            Err(e) => {
                log::debug!("Shot at slot {} ignored: {}", slot_index, e);
                return None;
            }
        };

        self.apply_upgrade(&pick.roll);
        self.events.push(GameEvent::PickMade {
            slot_index: pick.slot_index,
            remaining: pick.remaining,
            instruction: self.station.instruction_text(),
        });

        if pick.phase_complete {
            log::info!("Upgrade phase for round {} complete", self.round.index);
            self.events.push(GameEvent::PhaseComplete {
                round: self.round.index,
            });
            self.schedule_phase_exit();
        }
        Some(pick)
    }

    /// Player took damage from an enemy. Returns health actually lost.
    pub fn damage_player(&mut self, amount: f32) -> f32 {
        let Some(player) = self.player.as_mut() else {
            log::warn!("damage_player called with no player bound");
            return 0.0;
        };
        if player.is_dead() {
            return 0.0;
        }
        let lost = player.take_damage(amount);
        let health = player.current_health();
        let died = player.is_dead();
        self.events.push(GameEvent::PlayerDamaged {
            amount: lost,
            health,
        });
        if died {
            log::info!("Player died in round {}", self.round.index);
            self.events.push(GameEvent::PlayerDied {
                round: self.round.index,
            });
        }
        lost
    }

    // ── Upgrades ───────────────────────────────────────────────────────

    /// Apply a picked upgrade to the player or the global weapon modifiers.
    pub fn apply_upgrade(&mut self, roll: &UpgradeRoll) -> UpgradeOutcome {
        log::info!(
            "Applying upgrade {} ({:?}, {:?}, value {})",
            roll.display_name,
            roll.kind(),
            roll.rarity,
            roll.actual_value
        );

        let kind = roll.kind();
        let outcome = if kind.is_global_weapon_stat() {
            self.apply_weapon_upgrade(kind, roll.actual_value)
        } else {
            match self.player.as_mut() {
                None => {
                    log::warn!("No player bound, {:?} upgrade ignored", kind);
                    UpgradeOutcome::Ignored
                }
                Some(player) => apply_player_upgrade(&mut **player, kind, roll.actual_value),
            }
        };

        self.events.push(GameEvent::UpgradeApplied {
            upgrade_id: roll.definition.id.to_string(),
            kind: roll.kind(),
            rarity: roll.rarity,
            value: roll.actual_value,
            outcome,
        });
        outcome
    }

    fn apply_weapon_upgrade(&mut self, kind: UpgradeType, value: f32) -> UpgradeOutcome {
        if value <= 0.0 {
            log::warn!("{:?} upgrade with value {} ignored", kind, value);
            return UpgradeOutcome::Ignored;
        }
        match kind {
            UpgradeType::Damage => self.modifiers.add_damage_percent(value),
            UpgradeType::FireRate => self.modifiers.add_fire_rate_percent(value),
            _ => return UpgradeOutcome::Ignored,
        }
        self.broadcast_modifiers();
        UpgradeOutcome::Applied
    }

    fn broadcast_modifiers(&mut self) {
        let report = self.broadcaster.broadcast(&self.modifiers);
        self.events.push(GameEvent::ModifiersBroadcast {
            damage_multiplier: self.modifiers.damage_multiplier(),
            fire_rate_multiplier: self.modifiers.fire_rate_multiplier(),
            weapons_updated: report.updated,
        });
    }

    // ── Frame update ───────────────────────────────────────────────────

    /// Advance time and run any continuations that are due and still current.
    pub fn tick(&mut self, delta_secs: f32) {
        for entry in self.scheduler.advance(delta_secs) {
            if entry.generation != self.generation {
                log::debug!("Dropping stale continuation {:?}", entry.action);
                continue;
            }
            match entry.action {
                Continuation::HideBanner(banner) => {
                    match banner {
                        Banner::RoundStart => self.banners.round_start = false,
                        Banner::RoundEnd => self.banners.round_end = false,
                    }
                    self.events.push(GameEvent::BannerHidden(banner));
                }
                Continuation::FinishUpgradePhase => {
                    if let Err(e) = self.start_next_round() {
                        log::error!("Could not start the next round: {}", e);
                    }
                }
            }
        }
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn modifiers(&self) -> &GlobalPlayerModifiers {
        &self.modifiers
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &UpgradeCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> &WaveHealthTracker {
        &self.tracker
    }

    pub fn station(&self) -> &SelectionStation {
        &self.station
    }

    pub fn broadcaster(&self) -> &StatBroadcaster {
        &self.broadcaster
    }

    pub fn player(&self) -> Option<&dyn PlayerStats> {
        self.player.as_deref()
    }

    pub fn banners(&self) -> Banners {
        self.banners
    }

    /// Seconds of game time fed through [`Self::tick`].
    pub fn elapsed_secs(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn pending_continuations(&self) -> usize {
        self.scheduler.len()
    }
}

fn apply_player_upgrade(player: &mut dyn PlayerStats, kind: UpgradeType, value: f32) -> UpgradeOutcome {
    if kind != UpgradeType::HealToFull && value <= 0.0 {
        log::warn!("{:?} upgrade with value {} ignored", kind, value);
        return UpgradeOutcome::Ignored;
    }
    match kind {
        UpgradeType::HealToFull => player.heal_to_full(),
        UpgradeType::IncreaseMaxHealth => player.increase_max_health(value),
        UpgradeType::DamageReduction => {
            if player.is_damage_reduction_capped() {
                return UpgradeOutcome::RejectedAtCap;
            }
            if !player.increase_damage_reduction(value / 100.0) {
                return UpgradeOutcome::Ignored;
            }
        }
        UpgradeType::MovementSpeed => player.increase_movement_speed(value / 100.0),
        UpgradeType::Damage | UpgradeType::FireRate => {
            log::warn!("{:?} is not a player stat, ignored", kind);
            return UpgradeOutcome::Ignored;
        }
    }
    UpgradeOutcome::Applied
}
