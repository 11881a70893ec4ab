//! One-shot in-process execution without a listening server.

use std::io::{self, Write};

use deploy_protocol::{CommandRequest, ParseError};
use thiserror::Error;
use tracing::info;

use crate::deployer::{CancellationToken, Deployer};
use crate::dispatch::execute;

const LOCAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::local");

/// Failures of a local instance run.
#[derive(Debug, Error)]
pub enum LocalRunError {
    /// The arguments do not form a valid request.
    #[error(transparent)]
    Request(#[from] ParseError),
    /// The output stream rejected a write.
    #[error("failed to write local instance output: {source}")]
    Output {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for LocalRunError {
    fn from(source: io::Error) -> Self {
        Self::Output { source }
    }
}

/// Runs one command directly against `deployer`, writing its output to
/// `out`.
///
/// Returns whether the command succeeded.
///
/// # Errors
///
/// Returns [`LocalRunError::Request`] when `args` do not form a valid
/// request and [`LocalRunError::Output`] when `out` cannot be written.
pub fn run_local_instance<S: AsRef<str>>(
    args: &[S],
    deployer: &dyn Deployer,
    out: &mut dyn Write,
) -> Result<bool, LocalRunError> {
    let request = CommandRequest::from_tokens(args)?;
    info!(target: LOCAL_TARGET, command = %request.kind, "running local instance");
    writeln!(out, "Running as local instance")?;
    let success = execute(deployer, &request, out, &CancellationToken::new());
    writeln!(out, "Deployment server ended local instance.")?;
    out.flush()?;
    Ok(success)
}
