//! Single-instance deployment command server.
//!
//! `deployd` listens on a loopback TCP port and runs deployment commands
//! against a [`Deployer`] backend. Each connection is a session: the server
//! announces its identity, reads one `\r`-terminated request line, streams
//! the command output and finishes with a `CMDOK` or `CMDFAIL` marker.
//!
//! Commands execute one at a time across all sessions. `stop` is the
//! exception: it is handled inline so a wedged command cannot block
//! shutdown. A machine-wide advisory lock keeps a second server from
//! serving while the first is alive, and a lifecycle monitor stops the
//! server after a stop request or once it has been idle with no sessions
//! for the configured inactivity timeout.
//!
//! The shipped binary uses [`NoopDeployer`]; embedders supply their own
//! [`Deployer`] to [`Server::bind`].

mod bootstrap;
mod deployer;
mod dispatch;
mod lifecycle;
mod local;
mod placeholder_deployer;
mod process;
mod server;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use deployer::{CancellationToken, Deployer, DeployerError};
pub use dispatch::{Dispatcher, ExecutionPermit};
pub use lifecycle::{
    LifecycleSettings, ServerState, SessionGuard, ShutdownReason, StateSnapshot,
};
pub use local::{LocalRunError, run_local_instance};
pub use placeholder_deployer::NoopDeployer;
pub use process::{
    GuardError, LaunchError, ShutdownError, ShutdownSignal, SingletonGuard,
    SystemShutdownSignal, run_server,
};
pub use server::Server;
pub use session::{SessionError, SessionState};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
