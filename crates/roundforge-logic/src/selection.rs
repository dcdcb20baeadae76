//! The shoot-to-pick upgrade station.
//!
//! Four shootable slots are filled at the start of each upgrade phase. Slot 0
//! is always heal-to-full; slots 1–3 are drawn without replacement from the
//! catalog. The station hands back at most one roll per slot and at most
//! `picks_allowed` rolls per phase, so a roll can never be applied twice.
//!
//! ```text
//! Idle ──begin_phase──▶ Presenting ──attempt_select × picks──▶ Complete
//!  ▲                                                             │
//!  └──────────────────────────── finish_phase ───────────────────┘
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{DisplayColor, UpgradeCatalog, UpgradeDefinition, UpgradeRoll, UpgradeType};
use crate::error::SelectionError;

/// Number of shootable slots.
pub const SLOT_COUNT: usize = 4;

/// Slot holding the heal-to-full roll.
pub const HEAL_SLOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPhase {
    Idle,
    Presenting,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSlot {
    pub slot_index: usize,
    pub roll: Option<UpgradeRoll>,
    pub is_selected: bool,
}

impl SelectionSlot {
    fn empty(slot_index: usize) -> Self {
        Self {
            slot_index,
            roll: None,
            is_selected: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.roll.is_some()
    }

    /// What the presentation layer should draw for this slot.
    pub fn view(&self) -> SlotView {
        match &self.roll {
            Some(roll) => SlotView {
                slot_index: self.slot_index,
                visible: true,
                label: roll.display_name.clone(),
                color: if self.is_selected {
                    DisplayColor::GRAY
                } else {
                    roll.display_color
                },
                selected: self.is_selected,
            },
            None => SlotView {
                slot_index: self.slot_index,
                visible: false,
                label: String::new(),
                color: DisplayColor::WHITE,
                selected: false,
            },
        }
    }
}

/// Render-ready snapshot of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot_index: usize,
    pub visible: bool,
    pub label: String,
    pub color: DisplayColor,
    pub selected: bool,
}

/// A successful selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pick {
    pub slot_index: usize,
    pub roll: UpgradeRoll,
    /// Picks still available this phase.
    pub remaining: u8,
    pub phase_complete: bool,
}

#[derive(Debug, Clone)]
pub struct SelectionStation {
    phase: SelectionPhase,
    slots: [SelectionSlot; SLOT_COUNT],
    picks_allowed: u8,
    picks_made: u8,
}

impl SelectionStation {
    pub fn new() -> Self {
        Self {
            phase: SelectionPhase::Idle,
            slots: std::array::from_fn(SelectionSlot::empty),
            picks_allowed: 0,
            picks_made: 0,
        }
    }

    /// Roll a fresh set of choices and start presenting them.
    ///
    /// DamageReduction is left out of the draw when `damage_reduction_capped`.
    /// If fewer than three definitions are eligible the remaining slots stay
    /// empty, and `picks_allowed` shrinks to the number of populated slots.
    pub fn begin_phase(
        &mut self,
        picks_allowed: u8,
        damage_reduction_capped: bool,
        catalog: &UpgradeCatalog,
        rng: &mut impl Rng,
    ) -> Result<Vec<SlotView>, SelectionError> {
        if self.phase != SelectionPhase::Idle {
            log::warn!("begin_phase called while {:?}, ignoring", self.phase);
            return Err(SelectionError::PhaseInProgress(self.phase));
        }
        if picks_allowed == 0 {
            return Err(SelectionError::NoPicks);
        }

        self.clear_slots();

        self.slots[HEAL_SLOT].roll = Some(catalog.roll(catalog.heal_to_full(), true, rng));

        let mut eligible: Vec<&UpgradeDefinition> = catalog
            .all_definitions()
            .iter()
            .filter(|d| !(damage_reduction_capped && d.kind == UpgradeType::DamageReduction))
            .collect();
        eligible.shuffle(rng);

        for (slot, definition) in self.slots[HEAL_SLOT + 1..].iter_mut().zip(eligible) {
            slot.roll = Some(catalog.roll(definition, false, rng));
        }

        let populated = self.slots.iter().filter(|s| s.is_visible()).count() as u8;
        if picks_allowed > populated {
            log::warn!(
                "only {} choices available, reducing picks from {}",
                populated,
                picks_allowed
            );
        }
        self.picks_allowed = picks_allowed.min(populated);
        self.picks_made = 0;
        self.phase = SelectionPhase::Presenting;

        log::info!(
            "Upgrade phase began: pick {} of [{}]",
            self.picks_allowed,
            self.slots
                .iter()
                .filter_map(|s| s.roll.as_ref().map(|r| r.display_name.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(self.slot_views())
    }

    /// Try to take the upgrade in `slot_index`.
    ///
    /// On any error nothing changes, so repeated shots at the same slot can
    /// only ever produce one [`Pick`].
    pub fn attempt_select(&mut self, slot_index: usize) -> Result<Pick, SelectionError> {
        if self.phase != SelectionPhase::Presenting {
            return Err(SelectionError::NotPresenting(self.phase));
        }
        if self.picks_made >= self.picks_allowed {
            return Err(SelectionError::PickLimitReached(self.picks_allowed));
        }
        let slot = self
            .slots
            .get_mut(slot_index)
            .ok_or(SelectionError::InvalidSlot(slot_index))?;
        if slot.is_selected {
            log::debug!("slot {} already selected", slot_index);
            return Err(SelectionError::AlreadySelected(slot_index));
        }
        let roll = slot
            .roll
            .clone()
            .ok_or(SelectionError::EmptySlot(slot_index))?;

        slot.is_selected = true;
        self.picks_made += 1;
        let remaining = self.picks_allowed - self.picks_made;
        let phase_complete = remaining == 0;
        if phase_complete {
            self.phase = SelectionPhase::Complete;
        }

        log::info!(
            "Picked '{}' from slot {} ({} remaining)",
            roll.display_name,
            slot_index,
            remaining
        );
        Ok(Pick {
            slot_index,
            roll,
            remaining,
            phase_complete,
        })
    }

    /// Return to Idle after a completed phase. No-op in any other state.
    pub fn finish_phase(&mut self) -> bool {
        if self.phase != SelectionPhase::Complete {
            return false;
        }
        self.clear_slots();
        self.picks_allowed = 0;
        self.picks_made = 0;
        self.phase = SelectionPhase::Idle;
        true
    }

    /// Close the phase with nothing offered, so the round can move on.
    pub fn abandon_phase(&mut self) {
        if self.phase != SelectionPhase::Complete {
            log::warn!("Abandoning upgrade phase ({:?})", self.phase);
        }
        self.clear_slots();
        self.picks_allowed = 0;
        self.picks_made = 0;
        self.phase = SelectionPhase::Complete;
    }

    fn clear_slots(&mut self) {
        self.slots = std::array::from_fn(SelectionSlot::empty);
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn slots(&self) -> &[SelectionSlot; SLOT_COUNT] {
        &self.slots
    }

    pub fn slot_views(&self) -> Vec<SlotView> {
        self.slots.iter().map(SelectionSlot::view).collect()
    }

    pub fn picks_allowed(&self) -> u8 {
        self.picks_allowed
    }

    pub fn picks_made(&self) -> u8 {
        self.picks_made
    }

    pub fn can_make_pick(&self) -> bool {
        self.phase == SelectionPhase::Presenting && self.picks_made < self.picks_allowed
    }

    /// Instruction line shown above the choices.
    pub fn instruction_text(&self) -> String {
        match self.phase {
            SelectionPhase::Idle => String::new(),
            SelectionPhase::Complete => "Upgrades selected!".to_string(),
            SelectionPhase::Presenting if self.picks_made == 0 => {
                format!("Pick {} upgrade(s)", self.picks_allowed)
            }
            SelectionPhase::Presenting => {
                format!("Pick {} more upgrade(s)", self.picks_allowed - self.picks_made)
            }
        }
    }
}

impl Default for SelectionStation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Rarity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn presenting(seed: u64, picks: u8) -> SelectionStation {
        let mut station = SelectionStation::new();
        let mut rng = StdRng::seed_from_u64(seed);
        station
            .begin_phase(picks, false, &UpgradeCatalog::standard(), &mut rng)
            .unwrap();
        station
    }

    #[test]
    fn test_begin_phase_layout() {
        let station = presenting(3, 2);
        assert_eq!(station.phase(), SelectionPhase::Presenting);
        let heal = station.slots()[HEAL_SLOT].roll.as_ref().unwrap();
        assert_eq!(heal.kind(), UpgradeType::HealToFull);
        assert_eq!(heal.rarity, Rarity::Fixed);

        let drawn: Vec<_> = station.slots()[1..]
            .iter()
            .map(|s| s.roll.as_ref().unwrap().definition.id)
            .collect();
        assert_eq!(drawn.len(), 3);
        let mut unique = drawn.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3, "slots drawn with replacement: {:?}", drawn);
        assert!(station.slots()[1..]
            .iter()
            .all(|s| s.roll.as_ref().unwrap().rarity != Rarity::Fixed));
        assert_eq!(station.instruction_text(), "Pick 2 upgrade(s)");
    }

    #[test]
    fn test_pick_scenario() {
        let mut station = presenting(11, 2);

        let first = station.attempt_select(0).unwrap();
        assert_eq!(first.roll.kind(), UpgradeType::HealToFull);
        assert_eq!(first.remaining, 1);
        assert!(!first.phase_complete);
        assert_eq!(station.instruction_text(), "Pick 1 more upgrade(s)");

        assert_eq!(
            station.attempt_select(0),
            Err(SelectionError::AlreadySelected(0))
        );
        assert_eq!(station.picks_made(), 1);

        let second = station.attempt_select(2).unwrap();
        assert_eq!(second.remaining, 0);
        assert!(second.phase_complete);
        assert_eq!(station.phase(), SelectionPhase::Complete);
        assert_eq!(station.instruction_text(), "Upgrades selected!");
    }

    #[test]
    fn test_select_beyond_limit_is_noop() {
        let mut station = presenting(5, 1);
        station.attempt_select(1).unwrap();
        for slot in 0..SLOT_COUNT {
            assert!(station.attempt_select(slot).is_err());
        }
        assert_eq!(station.picks_made(), 1);
        assert!(!station.slots()[2].is_selected);
    }

    #[test]
    fn test_invalid_slot_and_idle() {
        let mut idle = SelectionStation::new();
        assert_eq!(
            idle.attempt_select(0),
            Err(SelectionError::NotPresenting(SelectionPhase::Idle))
        );

        let mut station = presenting(9, 2);
        assert_eq!(station.attempt_select(4), Err(SelectionError::InvalidSlot(4)));
        assert_eq!(station.picks_made(), 0);
    }

    #[test]
    fn test_capped_damage_reduction_never_offered() {
        let catalog = UpgradeCatalog::standard();
        for seed in 0..200 {
            let mut station = SelectionStation::new();
            let mut rng = StdRng::seed_from_u64(seed);
            station.begin_phase(2, true, &catalog, &mut rng).unwrap();
            assert!(station
                .slots()
                .iter()
                .filter_map(|s| s.roll.as_ref())
                .all(|r| r.kind() != UpgradeType::DamageReduction));
            assert!(station.slots().iter().all(|s| s.is_visible()));
        }
    }

    #[test]
    fn test_every_definition_eventually_offered() {
        let catalog = UpgradeCatalog::standard();
        let mut seen = std::collections::HashSet::new();
        for seed in 0..100 {
            let mut station = SelectionStation::new();
            let mut rng = StdRng::seed_from_u64(seed);
            station.begin_phase(2, false, &catalog, &mut rng).unwrap();
            for slot in &station.slots()[1..] {
                seen.insert(slot.roll.as_ref().unwrap().definition.id);
            }
        }
        assert_eq!(seen.len(), catalog.all_definitions().len());
    }

    #[test]
    fn test_begin_phase_rejected_while_presenting() {
        let mut station = presenting(1, 2);
        let mut rng = StdRng::seed_from_u64(2);
        let err = station
            .begin_phase(2, false, &UpgradeCatalog::standard(), &mut rng)
            .unwrap_err();
        assert_eq!(err, SelectionError::PhaseInProgress(SelectionPhase::Presenting));
    }

    #[test]
    fn test_zero_picks_rejected() {
        let mut station = SelectionStation::new();
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            station.begin_phase(0, false, &UpgradeCatalog::standard(), &mut rng),
            Err(SelectionError::NoPicks)
        );
        assert_eq!(station.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_picks_clamped_to_populated_slots() {
        let station = presenting(4, 9);
        assert_eq!(station.picks_allowed(), SLOT_COUNT as u8);
    }

    fn thin_catalog(ids: &[&str]) -> UpgradeCatalog {
        let standard = UpgradeCatalog::standard();
        UpgradeCatalog::new(
            standard.heal_to_full().clone(),
            ids.iter()
                .map(|id| standard.find(id).unwrap().clone())
                .collect(),
        )
    }

    #[test]
    fn test_thin_pool_hides_empty_slots_and_reduces_picks() {
        // Damage reduction is capped, so only one definition is eligible.
        let catalog = thin_catalog(&["dmg_reduction", "gun_dmg_boost"]);
        let mut station = SelectionStation::new();
        let mut rng = StdRng::seed_from_u64(12);
        let views = station.begin_phase(3, true, &catalog, &mut rng).unwrap();

        assert!(views[0].visible && views[1].visible);
        assert!(!station.slots()[2].is_visible());
        assert!(!station.slots()[3].is_visible());
        assert!(!views[2].visible && !views[3].visible);
        assert_eq!(
            station.slots()[1].roll.as_ref().unwrap().kind(),
            UpgradeType::Damage
        );
        assert_eq!(station.picks_allowed(), 2);
        assert_eq!(station.instruction_text(), "Pick 2 upgrade(s)");

        assert_eq!(station.attempt_select(2), Err(SelectionError::EmptySlot(2)));
        station.attempt_select(0).unwrap();
        let last = station.attempt_select(1).unwrap();
        assert!(last.phase_complete);
        assert_eq!(station.phase(), SelectionPhase::Complete);
    }

    #[test]
    fn test_empty_pool_still_offers_heal() {
        let catalog = thin_catalog(&[]);
        let mut station = SelectionStation::new();
        let mut rng = StdRng::seed_from_u64(1);
        station.begin_phase(2, false, &catalog, &mut rng).unwrap();
        assert_eq!(station.picks_allowed(), 1);
        assert!(station.attempt_select(HEAL_SLOT).unwrap().phase_complete);
    }

    #[test]
    fn test_abandon_phase_completes_empty() {
        let mut station = presenting(2, 2);
        station.abandon_phase();
        assert_eq!(station.phase(), SelectionPhase::Complete);
        assert!(!station.can_make_pick());
        assert!(station.slot_views().iter().all(|v| !v.visible));
        assert!(station.finish_phase());
    }

    #[test]
    fn test_finish_phase_resets() {
        let mut station = presenting(8, 1);
        assert!(!station.finish_phase());
        station.attempt_select(3).unwrap();
        assert!(station.finish_phase());
        assert_eq!(station.phase(), SelectionPhase::Idle);
        assert!(station.slots().iter().all(|s| s.roll.is_none() && !s.is_selected));
        assert_eq!(station.instruction_text(), "");
    }

    #[test]
    fn test_selected_slot_view_is_gray() {
        let mut station = presenting(6, 2);
        station.attempt_select(1).unwrap();
        let views = station.slot_views();
        assert!(views[1].selected);
        assert_eq!(views[1].color, DisplayColor::GRAY);
        assert_eq!(views[0].color, DisplayColor::LIGHT_GREEN);
        assert!(views.iter().all(|v| v.visible));
    }
}
