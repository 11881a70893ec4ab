use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::{Admission, ServerState};

/// Why a command was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    /// Another command holds the slot.
    Busy,
    /// The server is stopping and admits nothing new.
    Stopping,
}

/// Grants the single execution slot.
///
/// Waiters block on the shared condition variable; whichever re-acquires the
/// state lock first after a release wins.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: Arc<ServerState>,
}

impl Dispatcher {
    /// Creates a dispatcher over the shared server state.
    #[must_use]
    pub const fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Takes the slot if it is free right now.
    #[must_use]
    pub fn try_admit(&self) -> Option<ExecutionPermit> {
        self.admit_within(Duration::ZERO).ok()
    }

    /// Waits up to `wait` for the slot.
    pub(crate) fn admit_within(&self, wait: Duration) -> Result<ExecutionPermit, Refusal> {
        match self.state.claim_execution_slot(wait) {
            Admission::Granted => Ok(ExecutionPermit {
                state: Arc::clone(&self.state),
            }),
            Admission::Busy => Err(Refusal::Busy),
            Admission::Stopping => Err(Refusal::Stopping),
        }
    }
}

/// Proof of holding the execution slot. Dropping it frees the slot and wakes
/// waiting sessions.
#[derive(Debug)]
pub struct ExecutionPermit {
    state: Arc<ServerState>,
}

impl Drop for ExecutionPermit {
    fn drop(&mut self) {
        self.state.release_execution_slot();
    }
}
