//! Runs a real [`Server`] on an ephemeral loopback port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::deployer::Deployer;
use crate::lifecycle::{LifecycleSettings, ServerState, ShutdownReason};
use crate::server::Server;

pub(crate) const TEST_IDENTITY: &str = "/opt/deploy/tests";

/// Timing tight enough for tests; the idle timeout stays out of the way.
pub(crate) fn fast_settings() -> LifecycleSettings {
    LifecycleSettings {
        inactivity_timeout: Duration::from_secs(60),
        min_inactivity_timeout: Duration::from_millis(200),
        stop_grace: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
    }
}

pub(crate) struct RunningServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    thread: Option<JoinHandle<ShutdownReason>>,
}

impl RunningServer {
    pub(crate) fn start(deployer: Arc<dyn Deployer>, settings: LifecycleSettings) -> Self {
        let loopback = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = Server::bind_at(loopback, TEST_IDENTITY.to_owned(), deployer, settings)
            .expect("bind test server");
        let addr = server.local_addr();
        let state = server.state();
        let thread = thread::spawn(move || server.run().expect("server run"));
        Self {
            addr,
            state,
            thread: Some(thread),
        }
    }

    pub(crate) const fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub(crate) fn wait_for_sessions(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state.snapshot().active_sessions != count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    /// Waits for the server loop to return and hands back its reason.
    pub(crate) fn wait_for_exit(&mut self, timeout: Duration) -> Option<ShutdownReason> {
        let deadline = Instant::now() + timeout;
        let thread = self.thread.take()?;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                self.thread = Some(thread);
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
        thread.join().ok()
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.state.request_stop();
            self.state.force_terminate();
        }
    }
}
