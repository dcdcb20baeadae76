//! Round and upgrade progression for Roundforge.
//!
//! This crate holds the game rules that do not depend on an engine: wave
//! sizing, aggregate enemy health, the shoot-to-pick upgrade station, rarity
//! rolls, and the global weapon modifiers. A host drives it by binding a
//! spawner, a player, and weapons to a [`round::RoundController`], feeding it
//! damage and death reports plus a frame delta, and draining the
//! [`events::GameEvent`]s it emits.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`broadcast`] | Global damage/fire-rate multipliers and weapon fan-out |
//! | [`catalog`] | Upgrade definitions, rarity table, rolled upgrades |
//! | [`config`] | Tunable wave sizes, health, and delays (JSON) |
//! | [`error`] | Round, selection, and config errors |
//! | [`events`] | Outbox events for the presentation layer |
//! | [`player`] | Player stats contract and built-in state |
//! | [`round`] | Round lifecycle state machine |
//! | [`schedule`] | Generation-tagged delayed continuations |
//! | [`selection`] | Four-slot upgrade station and pick accounting |
//! | [`spawner`] | Enemy identity and wave spawning contract |
//! | [`wave`] | Aggregate wave health and the cleared latch |
//! | [`weapon`] | Weapon stat contract and effective-stat math |

pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod player;
pub mod round;
pub mod schedule;
pub mod selection;
pub mod spawner;
pub mod wave;
pub mod weapon;
