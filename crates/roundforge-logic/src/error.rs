//! Error types for the progression engine.
//!
//! None of these are fatal to a running game. Callers log them and carry on
//! with "fewer choices" or "no effect".

use thiserror::Error;

use crate::round::RoundState;
use crate::selection::SelectionPhase;

/// Why the round controller refused a transition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoundError {
    #[error("required collaborator not bound: {0}")]
    MissingCollaborator(&'static str),

    #[error("cannot {action} while in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: RoundState,
    },

    #[error("spawner produced an empty wave for round {round}")]
    EmptyWave { round: u32 },
}

/// Why a selection station call was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("an upgrade phase is already in progress ({0:?})")]
    PhaseInProgress(SelectionPhase),

    #[error("an upgrade phase needs at least one pick")]
    NoPicks,

    #[error("station is not presenting choices ({0:?})")]
    NotPresenting(SelectionPhase),

    #[error("pick limit of {0} already reached")]
    PickLimitReached(u8),

    #[error("slot {0} does not exist")]
    InvalidSlot(usize),

    #[error("slot {0} has no upgrade assigned")]
    EmptySlot(usize),

    #[error("slot {0} was already selected")]
    AlreadySelected(usize),
}

/// Problems loading or validating a [`crate::config::ProgressionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse progression config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid progression config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
