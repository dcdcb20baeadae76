//! Delayed continuations for a tick-driven game loop.
//!
//! Each entry carries the [`Generation`] that was current when it was
//! scheduled. When it comes due, the owner compares that token with its
//! current generation and drops the entry if state has moved on, so a late
//! "hide banner" can never touch a newer round's UI.

use serde::{Deserialize, Serialize};

/// Monotonic state token. Bumped on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheduled<A> {
    pub due_at: f64,
    pub generation: Generation,
    pub action: A,
}

/// Time-ordered queue of pending actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler<A> {
    now: f64,
    pending: Vec<Scheduled<A>>,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            pending: Vec::new(),
        }
    }

    /// Seconds elapsed since creation.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Queue `action` to fire `delay_secs` from now.
    pub fn schedule(&mut self, delay_secs: f32, generation: Generation, action: A) {
        let due_at = self.now + f64::from(delay_secs.max(0.0));
        // Keep the queue sorted; ties fire in insertion order.
        let index = self.pending.partition_point(|s| s.due_at <= due_at);
        self.pending.insert(
            index,
            Scheduled {
                due_at,
                generation,
                action,
            },
        );
    }

    /// Advance the clock and return every entry that is now due, oldest first.
    pub fn advance(&mut self, delta_secs: f32) -> Vec<Scheduled<A>> {
        self.now += f64::from(delta_secs.max(0.0));
        let due = self.pending.partition_point(|s| s.due_at <= self.now);
        self.pending.drain(..due).collect()
    }

    /// Drop every entry scheduled under a generation other than `current`.
    pub fn cancel_stale(&mut self, current: Generation) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| s.generation == current);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
