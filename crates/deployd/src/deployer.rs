//! Boundary to the device deployment backend.
//!
//! The server never talks to devices itself. Every command is forwarded to a
//! [`Deployer`], which writes human-readable progress to the session sink and
//! reports success or failure.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Cooperative cancellation flag shared between a session and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Failures reported by a [`Deployer`].
#[derive(Debug, Error)]
pub enum DeployerError {
    /// Writing to the session sink failed.
    #[error("failed to write command output: {source}")]
    Output {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The device rejected or failed the operation.
    #[error("{message}")]
    Device {
        /// Description supplied by the backend.
        message: String,
    },
    /// No backend is able to perform the operation.
    #[error("no device backend is attached; cannot {operation}")]
    Unavailable {
        /// Operation that was requested.
        operation: &'static str,
    },
}

impl From<io::Error> for DeployerError {
    fn from(source: io::Error) -> Self {
        Self::Output { source }
    }
}

/// Device deployment operations invoked by commands.
///
/// Commands run one at a time, except `listentodevice`, which gives up the
/// execution slot once it starts streaming. Implementations are shared
/// between threads and must use interior mutability for the target device.
pub trait Deployer: Send + Sync + 'static {
    /// Sets the device targeted by the next operation.
    fn set_device_id(&self, device_id: &str);

    /// Copies `files` from the device into a backup of `bundle`.
    fn backup_files(
        &self,
        bundle: &str,
        files: &[String],
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError>;

    /// Installs the files listed in `manifest` for `bundle`.
    fn install_files_on_device(
        &self,
        bundle: &str,
        manifest: &str,
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError>;

    /// Copies `source` to `destination` inside `bundle` on the device.
    fn copy_file_to_device(
        &self,
        bundle: &str,
        source: &str,
        destination: &str,
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError>;

    /// Installs an application package.
    fn install_ipa_on_device(&self, ipa_path: &str, out: &mut dyn Write)
    -> Result<bool, DeployerError>;

    /// Reports the devices currently connected.
    fn enumerate_connected_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError>;

    /// Lists every known device.
    fn list_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError>;

    /// Sends `param` through a tunnel to `device`.
    fn tunnel_to_device(
        &self,
        device: &str,
        param: &str,
        out: &mut dyn Write,
    ) -> Result<(), DeployerError>;

    /// Streams device output into `out` until the device stops or `cancel`
    /// is signalled.
    fn listen_to_device(
        &self,
        device: &str,
        out: &mut dyn Write,
        cancel: &CancellationToken,
    ) -> Result<(), DeployerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
