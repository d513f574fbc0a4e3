//! Per-command lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a command is in the proxy pipeline.
///
/// Transitions only move forward. `Complete` and `Errored` are terminal.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandState {
    Received = 0,
    BodyBuffered = 1,
    BarriersRunning = 2,
    Forwarding = 3,
    UpstreamResponding = 4,
    Complete = 5,
    Errored = 6,
}

impl CommandState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandState::Complete | CommandState::Errored)
    }
}

impl From<u8> for CommandState {
    fn from(val: u8) -> Self {
        match val {
            1 => CommandState::BodyBuffered,
            2 => CommandState::BarriersRunning,
            3 => CommandState::Forwarding,
            4 => CommandState::UpstreamResponding,
            5 => CommandState::Complete,
            6 => CommandState::Errored,
            _ => CommandState::Received,
        }
    }
}

/// Lock-free holder for a [`CommandState`].
#[derive(Debug)]
pub struct AtomicCommandState(AtomicU8);

impl AtomicCommandState {
    pub fn new() -> Self {
        Self(AtomicU8::new(CommandState::Received as u8))
    }

    pub fn load(&self) -> CommandState {
        CommandState::from(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it is ahead of the current state and the current
    /// state is not terminal. Returns true if the state changed.
    ///
    /// The body is buffered concurrently with the barrier chain, so
    /// `BodyBuffered` may arrive after `BarriersRunning`; it is then a no-op.
    pub fn advance(&self, next: CommandState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = CommandState::from(current);
                if current.is_terminal() || next <= current {
                    None
                } else {
                    Some(next as u8)
                }
            })
            .is_ok()
    }
}

impl Default for AtomicCommandState {
    fn default() -> Self {
        Self::new()
    }
}
