use std::io;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use crate::lifecycle::ServerState;

use super::PROCESS_TARGET;

/// Abstraction over termination notification mechanisms.
pub trait ShutdownSignal: Send + Sync + 'static {
    /// Blocks until the process is asked to terminate.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by termination signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener for the conventional termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(target: PROCESS_TARGET, signal, "termination signal received");
        }
        Ok(())
    }
}

/// Turns a termination signal into a stop request on a background thread.
pub(crate) fn watch<S: ShutdownSignal>(signal: S, state: Arc<ServerState>) {
    let spawned = thread::Builder::new()
        .name("deployd-signals".into())
        .spawn(move || match signal.wait() {
            Ok(()) => {
                state.request_stop();
            }
            Err(error) => warn!(
                target: PROCESS_TARGET,
                error = %error,
                "signal watcher failed; relying on stop command and idle timeout"
            ),
        });
    if let Err(error) = spawned {
        warn!(
            target: PROCESS_TARGET,
            error = %error,
            "failed to spawn signal watcher"
        );
    }
}
