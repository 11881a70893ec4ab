use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::LIFECYCLE_TARGET;
use super::state::ServerState;

/// Why a server instance stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A `stop` command or a termination signal asked for it.
    StopRequested,
    /// No session showed activity for longer than the inactivity timeout.
    InactivityTimeout,
}

/// Blocks the main server thread until the server should stop.
#[derive(Debug)]
pub(crate) struct LifecycleMonitor {
    state: Arc<ServerState>,
    poll_interval: Duration,
}

impl LifecycleMonitor {
    pub(crate) const fn new(state: Arc<ServerState>, poll_interval: Duration) -> Self {
        Self {
            state,
            poll_interval,
        }
    }

    pub(crate) fn run(&self) -> ShutdownReason {
        let reason = self.state.wait_for_shutdown(self.poll_interval);
        let snapshot = self.state.snapshot();
        info!(
            target: LIFECYCLE_TARGET,
            ?reason,
            idle_ms = snapshot.last_activity.elapsed().as_millis(),
            timeout_ms = snapshot.inactivity_timeout.as_millis(),
            "server shutting down"
        );
        reason
    }
}
