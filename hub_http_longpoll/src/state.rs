//! Lifecycle state shared between the owner and the poll loop.
//!
//! ```text
//! Idle ──start()──► Probing ──200──► Active ──204 / error / stop()──► Stopped
//!                      │                                                 ▲
//!                      └──────── non-200 / failure / stop() ─────────────┘
//! ```
//!
//! Transitions only ever move rightwards. Each one is a single
//! compare-exchange, so exactly one party wins any contested transition.

use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`LongPollingTransport`](crate::LongPollingTransport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    /// Constructed, `start` not yet called.
    Idle = 0,

    /// `start` is waiting for the probe request.
    Probing = 1,

    /// The poll loop is running.
    Active = 2,

    /// Terminal.
    Stopped = 3,
}

impl State {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Probing,
            2 => Self::Active,
            _ => Self::Stopped,
        }
    }
}

/// An atomically updated [`State`].
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(State::Idle as u8))
    }

    pub(crate) fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move from `from` to `to`.
    ///
    /// Returns the actual state on failure.
    pub(crate) fn transition(&self, from: State, to: State) -> Result<(), State> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(State::from_u8)
    }

    /// Move to [`State::Stopped`] from `Probing` or `Active`.
    ///
    /// Returns the state this call moved away from, or `None` if the
    /// transport was idle or already stopped.
    pub(crate) fn deactivate(&self) -> Option<State> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                match State::from_u8(raw) {
                    State::Probing | State::Active => Some(State::Stopped as u8),
                    State::Idle | State::Stopped => None,
                }
            })
            .ok()
            .map(State::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(AtomicState::new().load(), State::Idle);
    }

    #[test]
    fn transition_follows_lifecycle() {
        let state = AtomicState::new();
        assert_eq!(state.transition(State::Idle, State::Probing), Ok(()));
        assert_eq!(state.transition(State::Probing, State::Active), Ok(()));
        assert_eq!(state.transition(State::Active, State::Stopped), Ok(()));
        assert_eq!(state.load(), State::Stopped);
    }

    #[test]
    fn contested_transition_has_one_winner() {
        let state = AtomicState::new();
        state.transition(State::Idle, State::Probing).ok();
        state.transition(State::Probing, State::Active).ok();

        assert_eq!(state.transition(State::Active, State::Stopped), Ok(()));
        assert_eq!(
            state.transition(State::Active, State::Stopped),
            Err(State::Stopped)
        );
    }

    #[test]
    fn deactivate_reports_previous_state() {
        let state = AtomicState::new();
        state.transition(State::Idle, State::Probing).ok();
        state.transition(State::Probing, State::Active).ok();

        assert_eq!(state.deactivate(), Some(State::Active));
        assert_eq!(state.deactivate(), None);
        assert_eq!(state.load(), State::Stopped);
    }

    #[test]
    fn deactivate_interrupts_probe() {
        let state = AtomicState::new();
        state.transition(State::Idle, State::Probing).ok();

        assert_eq!(state.deactivate(), Some(State::Probing));
        assert_eq!(
            state.transition(State::Probing, State::Active),
            Err(State::Stopped)
        );
    }

    #[test]
    fn deactivate_leaves_idle_untouched() {
        let state = AtomicState::new();
        assert_eq!(state.deactivate(), None);
        assert_eq!(state.load(), State::Idle);
    }
}
