//! Shared runtime counters guarded by one mutex and one condition variable.
//!
//! Every mutation notifies the condition variable so the monitor, pending
//! sessions and a stopping session all observe changes without busy polling.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::monitor::ShutdownReason;
use super::settings::LifecycleSettings;

/// Outcome of asking for the execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Granted,
    Busy,
    Stopping,
}

#[derive(Debug)]
struct Counters {
    active_sessions: usize,
    stop_reason: Option<ShutdownReason>,
    terminating: bool,
    executing: bool,
    last_activity: Instant,
    inactivity_timeout: Duration,
}

impl Counters {
    fn shutdown_due(&mut self, now: Instant) -> Option<ShutdownReason> {
        if self.active_sessions > 0 {
            return None;
        }
        if self.stop_reason.is_none()
            && now.saturating_duration_since(self.last_activity) > self.inactivity_timeout
        {
            self.stop_reason = Some(ShutdownReason::InactivityTimeout);
        }
        self.stop_reason
    }
}

/// Point-in-time copy of the runtime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Sessions currently connected.
    pub active_sessions: usize,
    /// Whether a stop has been requested or the inactivity timeout fired.
    pub stopping: bool,
    /// Whether running commands must be abandoned.
    pub terminating: bool,
    /// Whether the execution slot is taken.
    pub executing: bool,
    /// Last time a keep-alive session showed activity.
    pub last_activity: Instant,
    /// Effective inactivity timeout.
    pub inactivity_timeout: Duration,
}

/// Runtime counters shared by every session, the dispatcher and the monitor.
#[derive(Debug)]
pub struct ServerState {
    counters: Mutex<Counters>,
    changed: Condvar,
    min_inactivity_timeout: Duration,
}

impl ServerState {
    /// Creates fresh counters; the inactivity clock starts now.
    #[must_use]
    pub fn new(settings: &LifecycleSettings) -> Self {
        Self {
            counters: Mutex::new(Counters {
                active_sessions: 0,
                stop_reason: None,
                terminating: false,
                executing: false,
                last_activity: Instant::now(),
                inactivity_timeout: settings.floored(settings.inactivity_timeout),
            }),
            changed: Condvar::new(),
            min_inactivity_timeout: settings.min_inactivity_timeout,
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, change: impl FnOnce(&mut Counters) -> T) -> T {
        let result = {
            let mut counters = self.counters();
            change(&mut counters)
        };
        self.changed.notify_all();
        result
    }

    fn wait_on<'a>(
        &self,
        counters: MutexGuard<'a, Counters>,
        timeout: Duration,
    ) -> MutexGuard<'a, Counters> {
        match self.changed.wait_timeout(counters, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    /// Registers a connected session until the returned guard drops.
    #[must_use]
    pub fn open_session(self: &Arc<Self>) -> SessionGuard {
        self.update(|counters| counters.active_sessions += 1);
        SessionGuard {
            state: Arc::clone(self),
        }
    }

    /// Resets the inactivity clock.
    pub fn touch(&self) {
        self.update(|counters| counters.last_activity = Instant::now());
    }

    /// Replaces the inactivity timeout, applying the floor. Returns the
    /// effective value.
    pub fn set_inactivity_timeout(&self, requested: Duration) -> Duration {
        let effective = requested.max(self.min_inactivity_timeout);
        self.update(|counters| counters.inactivity_timeout = effective);
        effective
    }

    /// Marks the server as stopping. Returns `true` only for the request that
    /// actually flipped the flag.
    pub fn request_stop(&self) -> bool {
        self.update(|counters| {
            if counters.stop_reason.is_some() {
                return false;
            }
            counters.stop_reason = Some(ShutdownReason::StopRequested);
            true
        })
    }

    /// Whether the server is stopping.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.counters().stop_reason.is_some()
    }

    /// Tells running sessions to abandon their commands.
    pub fn force_terminate(&self) {
        self.update(|counters| counters.terminating = true);
    }

    /// Whether running commands must be abandoned.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.counters().terminating
    }

    /// Copies the current counters.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let counters = self.counters();
        StateSnapshot {
            active_sessions: counters.active_sessions,
            stopping: counters.stop_reason.is_some(),
            terminating: counters.terminating,
            executing: counters.executing,
            last_activity: counters.last_activity,
            inactivity_timeout: counters.inactivity_timeout,
        }
    }

    /// Decides whether the server should shut down at `now`.
    ///
    /// With no sessions left, a pending stop request ends the server, and so
    /// does an idle period longer than the inactivity timeout. The first
    /// decision is latched, so later calls report the same reason.
    pub fn evaluate(&self, now: Instant) -> Option<ShutdownReason> {
        let (reason, flipped) = {
            let mut counters = self.counters();
            let before = counters.stop_reason;
            let reason = counters.shutdown_due(now);
            (reason, before.is_none() && reason.is_some())
        };
        if flipped {
            self.changed.notify_all();
        }
        reason
    }

    /// Blocks until [`ServerState::evaluate`] would report a reason. Wakes on
    /// every state change and at least once per `poll_interval`.
    pub(crate) fn wait_for_shutdown(&self, poll_interval: Duration) -> ShutdownReason {
        loop {
            if let Some(reason) = self.evaluate(Instant::now()) {
                return reason;
            }
            let counters = self.counters();
            if counters.stop_reason.is_some() && counters.active_sessions == 0 {
                continue;
            }
            drop(self.wait_on(counters, poll_interval));
        }
    }

    /// Tries to take the execution slot, waiting up to `wait` for it.
    pub(crate) fn claim_execution_slot(&self, wait: Duration) -> Admission {
        let deadline = Instant::now() + wait;
        let mut counters = self.counters();
        loop {
            if counters.stop_reason.is_some() {
                return Admission::Stopping;
            }
            if !counters.executing {
                counters.executing = true;
                return Admission::Granted;
            }
            let now = Instant::now();
            if now >= deadline {
                return Admission::Busy;
            }
            counters = self.wait_on(counters, deadline - now);
        }
    }

    pub(crate) fn release_execution_slot(&self) {
        self.update(|counters| counters.executing = false);
    }

    /// Waits until at most `limit` sessions remain. Returns `false` when the
    /// deadline passed first.
    pub(crate) fn wait_for_sessions_at_most(&self, limit: usize, deadline: Instant) -> bool {
        let mut counters = self.counters();
        loop {
            if counters.active_sessions <= limit {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            counters = self.wait_on(counters, deadline - now);
        }
    }
}

/// Keeps a session counted as active; decrements on drop, including during
/// unwinding.
#[derive(Debug)]
pub struct SessionGuard {
    state: Arc<ServerState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.update(|counters| {
            counters.active_sessions = counters.active_sessions.saturating_sub(1);
        });
    }
}
