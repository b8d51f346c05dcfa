//! Second-granularity countdown timers driven by external ticks.

/// What a single tick did to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing armed.
    Idle,
    /// Still counting; seconds left.
    Running(u32),
    /// Reached zero on this tick. The slot is now clear.
    Fired,
}

/// A named countdown that is armed on state entry and cleared on exit.
/// Clearing an empty slot is a no-op.
#[derive(Debug, Clone)]
pub struct TimerSlot {
    name: &'static str,
    remaining: Option<u32>,
}

impl TimerSlot {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            remaining: None,
        }
    }

    /// Arms the slot, replacing any countdown already running.
    pub fn arm(&mut self, seconds: u32) {
        if self.remaining.is_some() {
            tracing::debug!("Re-arming {} timer", self.name);
        }
        self.remaining = Some(seconds);
    }

    pub fn clear(&mut self) {
        if self.remaining.take().is_some() {
            tracing::debug!("Cleared {} timer", self.name);
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.remaining {
            None => TickOutcome::Idle,
            Some(left) if left <= 1 => {
                self.remaining = None;
                TickOutcome::Fired
            }
            Some(left) => {
                self.remaining = Some(left - 1);
                TickOutcome::Running(left - 1)
            }
        }
    }
}
