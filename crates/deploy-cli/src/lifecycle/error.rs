//! Error types for server launch operations.

use std::ffi::OsString;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use deployd::GuardError;
use thiserror::Error;

/// Errors raised while bringing up a server for the client.
#[derive(Debug, Error)]
pub(crate) enum LifecycleError {
    #[error("failed to take the launch lock: {source}")]
    LaunchLock {
        #[source]
        source: GuardError,
    },
    #[error("failed to open server log {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn deployd binary '{binary:?}': {source}")]
    LaunchServer {
        binary: OsString,
        #[source]
        source: io::Error,
    },
    #[error("deployd exited before accepting connections (status: {exit_status:?})")]
    StartupFailed { exit_status: Option<i32> },
    #[error("failed to monitor server launch: {source}")]
    MonitorChild {
        #[source]
        source: io::Error,
    },
    #[error("deployment server at {addr} did not accept a connection after {attempts} attempts: {source}")]
    ConnectTimeout {
        addr: SocketAddr,
        attempts: u32,
        #[source]
        source: io::Error,
    },
}
