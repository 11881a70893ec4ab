//! Launching a server for a client that found none listening.

use std::ffi::OsString;
use std::net::{SocketAddr, TcpStream};

use deploy_config::RuntimePaths;
use deployd::{GuardError, SingletonGuard};

use super::error::LifecycleError;
use super::socket::{RetryPolicy, connect_with_retry};
use super::spawning::{resolve_server_binary, spawn_server};
use super::termination::kill_server_processes;

/// Starts servers and clears out stale ones.
pub(crate) trait ServerLauncher {
    /// Ensures a server is starting and returns a connection to it.
    fn launch(&mut self) -> Result<TcpStream, LifecycleError>;

    /// Kills leftover server processes. Returns how many were signalled.
    fn kill_servers(&mut self) -> usize;
}

/// Everything needed to start a server matching the client's configuration.
#[derive(Debug, Clone)]
pub(crate) struct LaunchPlan {
    pub(crate) addr: SocketAddr,
    pub(crate) server_arguments: Vec<OsString>,
    pub(crate) paths: RuntimePaths,
    pub(crate) binary_override: Option<OsString>,
    pub(crate) retry: RetryPolicy,
}

/// Spawns the real `deployd` binary.
///
/// Clients racing to launch serialise on the launch lock; a client that loses
/// the race connects to whichever server the winner starts.
#[derive(Debug)]
pub(crate) struct SystemLauncher {
    plan: LaunchPlan,
}

impl SystemLauncher {
    pub(crate) const fn new(plan: LaunchPlan) -> Self {
        Self { plan }
    }
}

impl ServerLauncher for SystemLauncher {
    fn launch(&mut self) -> Result<TcpStream, LifecycleError> {
        let plan = &self.plan;
        let launch_lock = match SingletonGuard::try_acquire(plan.paths.launch_lock_path()) {
            Ok(guard) => Some(guard),
            Err(GuardError::Conflict { .. }) => None,
            Err(source) => return Err(LifecycleError::LaunchLock { source }),
        };

        let mut child = match launch_lock {
            Some(_) => {
                let binary = resolve_server_binary(plan.binary_override.as_deref());
                Some(spawn_server(
                    &binary,
                    &plan.server_arguments,
                    plan.paths.log_path(),
                )?)
            }
            None => None,
        };

        let stream = connect_with_retry(plan.addr, plan.retry, child.as_mut());
        drop(launch_lock);
        stream
    }

    fn kill_servers(&mut self) -> usize {
        kill_server_processes()
    }
}
