//! Error surface for server launch and singleton enforcement.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use deploy_config::RuntimePathsError;

use crate::telemetry::TelemetryError;
use crate::transport::ListenerError;

/// Failures taking or maintaining the singleton lock.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another process holds the lock.
    #[error("lock '{path}' is held by another process")]
    Conflict {
        /// Lock file path.
        path: PathBuf,
    },
    /// The lock file could not be opened.
    #[error("failed to open lock file '{path}': {source}")]
    Open {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Locking failed for a reason other than contention.
    #[error("failed to lock '{path}': {source}")]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the owner record failed.
    #[error("failed to record owner in '{path}': {source}")]
    Record {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced while launching or supervising the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Runtime paths or the server identity could not be resolved.
    #[error("failed to resolve runtime paths: {source}")]
    RuntimePaths {
        /// Underlying resolution error.
        #[source]
        source: RuntimePathsError,
    },
    /// The singleton lock failed for a reason other than contention.
    #[error("singleton lock failed: {source}")]
    Guard {
        /// Underlying guard error.
        #[source]
        source: GuardError,
    },
    /// The listener could not be bound or stopped.
    #[error("server listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<RuntimePathsError> for LaunchError {
    fn from(source: RuntimePathsError) -> Self {
        Self::RuntimePaths { source }
    }
}

impl From<GuardError> for LaunchError {
    fn from(source: GuardError) -> Self {
        Self::Guard { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}
