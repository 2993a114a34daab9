use std::time::Duration;

use tokio::time::Instant;

use super::timer::ExpiryTimer;

/// Whether the local participant is currently announced as typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingState {
    #[default]
    Idle,
    Typing,
}

/// Local typing state and the deadline that ends it.
#[derive(Debug)]
pub(crate) struct LocalTypingState {
    state: TypingState,
    timer: ExpiryTimer,
}

impl LocalTypingState {
    pub(crate) fn new(quiet_window: Duration) -> Self {
        Self {
            state: TypingState::Idle,
            timer: ExpiryTimer::new(quiet_window),
        }
    }

    pub(crate) fn state(&self) -> TypingState {
        self.state
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Enter (or stay in) `Typing` and restart the quiet window from `now`.
    pub(crate) fn start(&mut self, now: Instant) {
        self.state = TypingState::Typing;
        self.timer.arm(now);
    }

    /// Back to `Idle`, cancelling the deadline. Returns whether we were typing.
    pub(crate) fn stop(&mut self) -> bool {
        self.timer.clear();
        std::mem::replace(&mut self.state, TypingState::Idle) == TypingState::Typing
    }

    /// Apply a fired deadline. Returns `false` when the expiry is stale: the
    /// state is already `Idle` or the deadline has moved past `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> bool {
        if self.state == TypingState::Idle || !self.timer.is_due(now) {
            return false;
        }
        self.stop()
    }
}
