//! Error types for the client runtime.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use deploy_config::RuntimePathsError;
use deploy_protocol::ParseError;
use deployd::LocalRunError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid command: {0}")]
    Request(#[from] ParseError),
    #[error("failed to prepare runtime paths: {0}")]
    RuntimePaths(#[from] RuntimePathsError),
    #[error("failed to connect to deployment server at {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("lost connection to the deployment server: {0}")]
    Transport(io::Error),
    #[error("deployment server did not identify itself")]
    MissingPreamble,
    #[error("failed to write output: {0}")]
    Output(io::Error),
    #[error("deployment server launch failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl From<LocalRunError> for AppError {
    fn from(error: LocalRunError) -> Self {
        match error {
            LocalRunError::Request(source) => Self::Request(source),
            LocalRunError::Output { source } => Self::Output(source),
        }
    }
}
