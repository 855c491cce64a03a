//! Accepting/draining/stopped state machine with atomic admission.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::tracker::{InFlightGuard, InFlightTracker};

/// Whether the server takes new work.
///
/// Transitions only move forward: `Accepting -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerState {
    #[default]
    Accepting,
    Draining,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Accepting => "accepting",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Owner of the shared [`ServerState`].
///
/// Admission and the drain transition take the same lock. A request is
/// either registered before `begin_drain` returns, and is then covered by a
/// later [`InFlightTracker::await_drain`], or it observes `Draining` and is
/// rejected. There is no window where a request slips in unobserved.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: Mutex<ServerState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ServerState {
        *self.lock()
    }

    /// Registers a unit of work with `tracker` if the server is accepting.
    ///
    /// Returns the state that caused the rejection otherwise.
    pub fn admit(&self, tracker: &InFlightTracker) -> Result<InFlightGuard, ServerState> {
        let state = self.lock();
        match *state {
            ServerState::Accepting => Ok(tracker.register()),
            other => Err(other),
        }
    }

    /// Moves `Accepting -> Draining`.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn begin_drain(&self) -> bool {
        let mut state = self.lock();
        if *state != ServerState::Accepting {
            return false;
        }
        *state = ServerState::Draining;
        info!("server draining; new requests will be rejected");
        true
    }

    /// Terminal transition, driven by the orchestrator once the listener closed.
    pub fn mark_stopped(&self) {
        let mut state = self.lock();
        if *state != ServerState::Stopped {
            *state = ServerState::Stopped;
            info!("server stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
