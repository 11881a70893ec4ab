//! Launch sequencing for the server process.

use std::sync::Arc;

use tracing::info;

use deploy_config::RuntimePaths;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::deployer::Deployer;
use crate::lifecycle::ShutdownReason;
use crate::placeholder_deployer::NoopDeployer;
use crate::server::Server;
use crate::telemetry;

use super::PROCESS_TARGET;
use super::errors::{GuardError, LaunchError};
use super::guard::SingletonGuard;
use super::shutdown::{self, ShutdownSignal, SystemShutdownSignal};

/// Runs the server with the production collaborators.
///
/// Returns `Ok` without serving when another instance holds the singleton
/// lock.
///
/// # Errors
///
/// Propagates configuration, telemetry, lock and listener failures.
pub fn run_server() -> Result<(), LaunchError> {
    run_server_with(
        &SystemConfigLoader,
        SystemShutdownSignal,
        Arc::new(NoopDeployer::new()),
    )
    .map(|_| ())
}

/// Runs the server with injected collaborators.
///
/// `None` means another instance was already authoritative.
pub(crate) fn run_server_with<S: ShutdownSignal>(
    loader: &dyn ConfigLoader,
    signal: S,
    deployer: Arc<dyn Deployer>,
) -> Result<Option<ShutdownReason>, LaunchError> {
    let config = loader.load()?;
    telemetry::initialise(&config)?;
    let paths = RuntimePaths::from_config(&config)?;

    let mut guard = match SingletonGuard::try_acquire(paths.server_lock_path()) {
        Ok(guard) => guard,
        Err(GuardError::Conflict { path }) => {
            info!(
                target: PROCESS_TARGET,
                lock = %path.display(),
                "another deployment server is running; exiting"
            );
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };
    guard.record_pid(std::process::id())?;

    let server = Server::bind(&config, deployer)?;
    shutdown::watch(signal, server.state());
    let reason = server.run()?;
    drop(guard);
    info!(
        target: PROCESS_TARGET,
        ?reason,
        "shutdown sequence completed"
    );
    Ok(Some(reason))
}
