//! Roundforge Headless Progression Harness
//!
//! Plays scripted rounds against the pure progression logic and checks the
//! invariants a host engine relies on. No engine, no rendering.
//!
//! Usage:
//!   cargo run -p roundforge-simtest
//!   cargo run -p roundforge-simtest -- --seed 7 --rounds 10 --verbose
//!   cargo run -p roundforge-simtest -- --config progression.json

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roundforge_logic::catalog::{Rarity, UpgradeCatalog, UpgradeType};
use roundforge_logic::config::ProgressionConfig;
use roundforge_logic::events::{GameEvent, UpgradeOutcome};
use roundforge_logic::player::DAMAGE_REDUCTION_CAP;
use roundforge_logic::round::{RoundController, RoundState};
use roundforge_logic::selection::{SelectionPhase, HEAL_SLOT, SLOT_COUNT};
use roundforge_logic::spawner::EnemyId;
use roundforge_logic::weapon::{GunStats, MIN_FIRE_COOLDOWN};
use serde::Serialize;

const FRAME_SECS: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "roundforge-simtest", about = "Headless round progression harness")]
struct Args {
    /// RNG seed for rarity rolls and slot shuffles.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rounds to play in the scripted run.
    #[arg(long, default_value_t = 8)]
    rounds: u32,

    /// Print every check, not only failures.
    #[arg(long)]
    verbose: bool,

    /// Progression config JSON. Defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ProgressionConfig> {
    let Some(path) = path else {
        return Ok(ProgressionConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = ProgressionConfig::from_json(&text)
        .with_context(|| format!("loading config {}", path.display()))?;
    log::info!("Loaded progression config from {}", path.display());
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    if args.rounds == 0 {
        bail!("--rounds must be at least 1");
    }

    println!("=== Roundforge Progression Harness ===");
    println!("seed {}, {} rounds\n", args.seed, args.rounds);

    let mut results = Vec::new();

    // 1. Catalog and rarity table
    results.extend(validate_catalog(args.seed, args.verbose));

    // 2. Scripted multi-round playthrough
    results.extend(validate_playthrough(&config, args.seed, args.rounds, args.verbose));

    // 3. Guard rails on transitions and picks
    results.extend(validate_guards(&config, args.seed));

    // 4. Damage reduction cap across many rounds
    results.extend(validate_damage_reduction_cap(&config, args.seed));

    // 5. Weapon stat propagation
    results.extend(validate_weapon_stats(&config, args.seed));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for r in &results {
            let icon = if r.passed { "✓" } else { "✗" };
            if !r.passed || args.verbose {
                println!("  {} {}: {}", icon, r.name, r.detail);
            }
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Catalog ---");
    let mut results = Vec::new();
    let catalog = UpgradeCatalog::standard();

    results.push(TestResult::check(
        "catalog_pool_size",
        catalog.all_definitions().len() >= SLOT_COUNT - 1,
        format!("{} random definitions", catalog.all_definitions().len()),
    ));

    let heal_in_pool = catalog
        .all_definitions()
        .iter()
        .any(|d| d.kind == UpgradeType::HealToFull);
    results.push(TestResult::check(
        "catalog_heal_not_random",
        !heal_in_pool,
        "heal-to-full only appears in its fixed slot",
    ));

    let mut rng = StdRng::seed_from_u64(seed);
    let draws = 20_000;
    let mut counts = [0u32; 3];
    for _ in 0..draws {
        match Rarity::draw(&mut rng) {
            Rarity::Epic => counts[0] += 1,
            Rarity::Rare => counts[1] += 1,
            Rarity::Common => counts[2] += 1,
            Rarity::Fixed => {}
        }
    }
    let frac = |n: u32| n as f32 / draws as f32;
    let (epic, rare, common) = (frac(counts[0]), frac(counts[1]), frac(counts[2]));
    if verbose {
        println!(
            "  rarity split: epic {:.3}, rare {:.3}, common {:.3}",
            epic, rare, common
        );
    }
    results.push(TestResult::check(
        "rarity_distribution",
        (epic - 0.10).abs() < 0.02 && (rare - 0.30).abs() < 0.02 && (common - 0.60).abs() < 0.02,
        format!("epic {:.3} rare {:.3} common {:.3}", epic, rare, common),
    ));

    let bad_scaling: Vec<_> = catalog
        .all_definitions()
        .iter()
        .filter(|d| {
            let rolled = catalog.roll(d, false, &mut rng);
            let expected = d.base_value * rolled.rarity.value_multiplier();
            (rolled.actual_value - expected).abs() > 1e-4
        })
        .map(|d| d.id)
        .collect();
    results.push(TestResult::check(
        "rarity_value_scaling",
        bad_scaling.is_empty(),
        if bad_scaling.is_empty() {
            "every roll scales by its rarity multiplier".to_string()
        } else {
            format!("mis-scaled: {}", bad_scaling.join(", "))
        },
    ));

    results
}

// ── 2. Playthrough ──────────────────────────────────────────────────────

/// Scripted player: shoots every enemy down, picks upgrades, waits.
struct Playthrough {
    controller: RoundController,
    pistol: roundforge_logic::broadcast::WeaponId,
    next_enemy: u32,
    events: Vec<GameEvent>,
}

impl Playthrough {
    fn new(config: &ProgressionConfig, seed: u64) -> Self {
        let mut controller = RoundController::seeded(config.clone(), seed);
        let pistol = controller.register_weapon(Box::new(GunStats::pistol()));
        Self {
            controller,
            pistol,
            next_enemy: 0,
            events: Vec::new(),
        }
    }

    fn pump(&mut self, secs: f32) {
        let mut left = secs;
        while left > 0.0 {
            self.controller.tick(FRAME_SECS.min(left));
            left -= FRAME_SECS;
        }
        self.events.extend(self.controller.drain_events());
    }

    fn clear_wave(&mut self, enemy_max_health: f32) {
        let count = self.controller.round().enemy_count_for_wave;
        let damage = self
            .controller
            .broadcaster()
            .get(self.pistol)
            .map(|w| w.current_damage())
            .unwrap_or(1.0);
        for _ in 0..count {
            let id = EnemyId(self.next_enemy);
            self.next_enemy += 1;
            let mut hp = enemy_max_health;
            while hp > 0.0 {
                self.controller.report_enemy_damage(id, damage);
                hp -= damage;
            }
            self.controller.report_enemy_death(id);
        }
        self.events.extend(self.controller.drain_events());
    }
}

fn validate_playthrough(
    config: &ProgressionConfig,
    seed: u64,
    rounds: u32,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Playthrough ---");
    let mut results = Vec::new();
    let mut play = Playthrough::new(config, seed);
    let mut pick_rng = StdRng::seed_from_u64(seed ^ 0x5eed);

    if let Err(e) = play.controller.start_next_round() {
        results.push(TestResult::check("play_first_round", false, e.to_string()));
        return results;
    }

    let mut wave_sizes = Vec::new();
    let mut phase_errors = Vec::new();
    let mut pick_counts = Vec::new();
    let mut prev_damage = play.controller.modifiers().damage_multiplier();
    let mut multiplier_regressed = false;

    for round in 1..=rounds {
        wave_sizes.push(play.controller.round().enemy_count_for_wave);
        play.pump(FRAME_SECS);
        play.clear_wave(config.enemy_max_health);

        if play.controller.state() != RoundState::UpgradePhase {
            phase_errors.push(format!(
                "round {}: expected UpgradePhase, got {:?}",
                round,
                play.controller.state()
            ));
            break;
        }

        // Shoot random slots, including repeats, until the station closes.
        let mut applied = 0;
        let mut shots = 0;
        while play.controller.station().phase() == SelectionPhase::Presenting && shots < 64 {
            let slot = pick_rng.gen_range(0..SLOT_COUNT);
            if play.controller.player_shot_slot(slot).is_some() {
                applied += 1;
            }
            shots += 1;
        }
        pick_counts.push(applied);

        let damage = play.controller.modifiers().damage_multiplier();
        if damage < prev_damage {
            multiplier_regressed = true;
        }
        prev_damage = damage;

        if verbose {
            println!(
                "  [{:>7.2}s] round {}: {} enemies ({}), {} picks in {} shots, dmg x{:.2}, fire x{:.2}",
                play.controller.elapsed_secs(),
                round,
                wave_sizes.last().copied().unwrap_or(0),
                play.controller.tracker().health_label(),
                applied,
                shots,
                damage,
                play.controller.modifiers().fire_rate_multiplier()
            );
        }

        if round < rounds {
            play.pump(config.phase_exit_delay_secs + FRAME_SECS);
            if play.controller.round().index != round + 1 {
                phase_errors.push(format!("round {} did not advance after picks", round));
                break;
            }
        }
    }

    let expected: Vec<u32> = (1..=wave_sizes.len() as u32)
        .map(|r| config.enemy_count_for_round(r))
        .collect();
    results.push(TestResult::check(
        "play_wave_sizes",
        wave_sizes == expected,
        format!("{:?}", wave_sizes),
    ));

    results.push(TestResult::check(
        "play_state_flow",
        phase_errors.is_empty(),
        if phase_errors.is_empty() {
            format!("{} rounds completed", rounds)
        } else {
            phase_errors.join("; ")
        },
    ));

    let expected_picks = config.picks_per_round.min(SLOT_COUNT as u8);
    let bad_picks = pick_counts.iter().filter(|&&n| n != expected_picks).count();
    results.push(TestResult::check(
        "play_exact_picks",
        bad_picks == 0,
        format!("picks per round {:?}", pick_counts),
    ));

    let count = |name: &str| play.events.iter().filter(|e| e.name() == name).count();
    let cleared = count("WaveCleared");
    results.push(TestResult::check(
        "play_one_clear_per_round",
        cleared == pick_counts.len(),
        format!("{} WaveCleared for {} rounds", cleared, pick_counts.len()),
    ));

    let applied_events = play
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::UpgradeApplied { .. }))
        .count();
    let total_picks: usize = pick_counts.iter().map(|&n| n as usize).sum();
    results.push(TestResult::check(
        "play_one_application_per_pick",
        applied_events == total_picks,
        format!("{} applications for {} picks", applied_events, total_picks),
    ));

    results.push(TestResult::check(
        "play_multipliers_monotonic",
        !multiplier_regressed,
        format!(
            "final dmg x{:.2}",
            play.controller.modifiers().damage_multiplier()
        ),
    ));

    let pistol_damage = play
        .controller
        .broadcaster()
        .get(play.pistol)
        .map(|w| w.current_damage())
        .unwrap_or(0.0);
    let expected_damage = 10.0 * play.controller.modifiers().damage_multiplier();
    results.push(TestResult::check(
        "play_weapon_in_sync",
        (pistol_damage - expected_damage).abs() < 1e-3,
        format!("pistol {:.2}, expected {:.2}", pistol_damage, expected_damage),
    ));

    results
}

// ── 3. Guards ───────────────────────────────────────────────────────────

fn validate_guards(config: &ProgressionConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Guards ---");
    let mut results = Vec::new();
    let mut c = RoundController::seeded(config.clone(), seed);

    results.push(TestResult::check(
        "guard_end_before_start",
        c.end_round().is_err(),
        "end_round rejected in Boot",
    ));

    let started = c.start_next_round().is_ok();
    let second = c.start_next_round();
    results.push(TestResult::check(
        "guard_double_start",
        started && second.is_err() && c.round().index == 1,
        format!("{:?}", second),
    ));

    let early_shot = c.player_shot_slot(HEAL_SLOT);
    results.push(TestResult::check(
        "guard_shot_during_round",
        early_shot.is_none(),
        "slot shots ignored while the wave is active",
    ));

    let _ = c.end_round();
    let generation = c.generation();
    let repeat = c.end_round();
    results.push(TestResult::check(
        "guard_double_end",
        repeat.is_err() && c.generation() == generation,
        format!("{:?}", repeat),
    ));

    let first = c.player_shot_slot(HEAL_SLOT).is_some();
    let again = c.player_shot_slot(HEAL_SLOT).is_some();
    results.push(TestResult::check(
        "guard_same_slot_once",
        first && !again && c.station().picks_made() == 1,
        format!("picks made {}", c.station().picks_made()),
    ));

    let early_start = c.start_next_round();
    results.push(TestResult::check(
        "guard_start_before_picks",
        early_start.is_err() && c.state() == RoundState::UpgradePhase,
        format!("{:?}", early_start),
    ));

    // One wounded survivor in a large wave keeps the round open.
    let big = ProgressionConfig {
        initial_enemy_count: 500,
        ..config.clone()
    };
    let mut c = RoundController::seeded(big.clone(), seed);
    let survivor_open = c.start_next_round().is_ok() && {
        for id in 0..499 {
            c.report_enemy_death(EnemyId(id));
        }
        c.report_enemy_damage(EnemyId(499), big.enemy_max_health * 0.96);
        c.state() == RoundState::RoundActive && c.tracker().is_bar_visible()
    };
    results.push(TestResult::check(
        "guard_survivor_keeps_wave_open",
        survivor_open,
        format!(
            "{} remaining, health {}",
            c.tracker().enemies_remaining(),
            c.tracker().health_label()
        ),
    ));

    results
}

// ── 4. Damage reduction cap ─────────────────────────────────────────────

fn validate_damage_reduction_cap(config: &ProgressionConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Damage Reduction Cap ---");
    let mut results = Vec::new();
    let mut c = RoundController::seeded(config.clone(), seed);
    let catalog = UpgradeCatalog::standard();

    let mut rejected = 0;
    if let Some(def) = catalog.find("dmg_reduction") {
        let roll = roundforge_logic::catalog::UpgradeRoll::with_rarity(def, Rarity::Epic);
        for _ in 0..10 {
            if c.apply_upgrade(&roll) == UpgradeOutcome::RejectedAtCap {
                rejected += 1;
            }
        }
    }
    let dr = c.player().map(|p| p.damage_reduction()).unwrap_or(0.0);
    results.push(TestResult::check(
        "dr_never_exceeds_cap",
        dr <= DAMAGE_REDUCTION_CAP && rejected > 0,
        format!("reduction {:.2}, {} rejected", dr, rejected),
    ));

    let mut offered = 0;
    for _ in 0..25 {
        if c.start_next_round().is_err() || c.end_round().is_err() {
            break;
        }
        offered += c
            .station()
            .slots()
            .iter()
            .filter_map(|s| s.roll.as_ref())
            .filter(|r| r.kind() == UpgradeType::DamageReduction)
            .count();
        c.player_shot_slot(0);
        c.player_shot_slot(1);
    }
    results.push(TestResult::check(
        "dr_not_offered_when_capped",
        offered == 0,
        format!("offered {} times over 25 phases", offered),
    ));

    results
}

// ── 5. Weapon stats ─────────────────────────────────────────────────────

fn validate_weapon_stats(config: &ProgressionConfig, seed: u64) -> Vec<TestResult> {
    println!("--- Weapon Stats ---");
    let mut results = Vec::new();
    let mut c = RoundController::seeded(config.clone(), seed);
    let catalog = UpgradeCatalog::standard();
    let rifle = c.register_weapon(Box::new(GunStats::rifle()));

    if let Some(def) = catalog.find("gun_fire_rate_boost") {
        let roll = roundforge_logic::catalog::UpgradeRoll::with_rarity(def, Rarity::Epic);
        for _ in 0..40 {
            c.apply_upgrade(&roll);
        }
    }
    let cooldown = c
        .broadcaster()
        .get(rifle)
        .map(|w| w.current_cooldown())
        .unwrap_or(0.0);
    results.push(TestResult::check(
        "weapon_cooldown_floor",
        cooldown >= MIN_FIRE_COOLDOWN,
        format!("rifle cooldown {:.4}s", cooldown),
    ));

    let late = c.register_weapon(Box::new(GunStats::pistol()));
    let late_cooldown = c
        .broadcaster()
        .get(late)
        .map(|w| w.current_cooldown())
        .unwrap_or(f32::MAX);
    let expected = (0.25 / c.modifiers().fire_rate_multiplier()).max(MIN_FIRE_COOLDOWN);
    results.push(TestResult::check(
        "weapon_late_registration_synced",
        (late_cooldown - expected).abs() < 1e-6,
        format!("pistol cooldown {:.4}s", late_cooldown),
    ));

    let removed = c.unregister_weapon(late).is_some();
    results.push(TestResult::check(
        "weapon_unregister",
        removed && c.broadcaster().len() == 1,
        format!("{} weapons registered", c.broadcaster().len()),
    ));

    results
}
