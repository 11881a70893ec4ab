//! Deployer used by the shipped binary when no device backend is linked in.

use std::io::Write;

use crate::deployer::{CancellationToken, Deployer, DeployerError};

/// Reports that no device backend is attached.
///
/// Listing commands succeed with an empty device list; everything that would
/// touch a device fails with [`DeployerError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDeployer;

impl NoopDeployer {
    /// Creates the placeholder backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Deployer for NoopDeployer {
    fn set_device_id(&self, _device_id: &str) {}

    fn backup_files(
        &self,
        _bundle: &str,
        _files: &[String],
        _out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "back up files",
        })
    }

    fn install_files_on_device(
        &self,
        _bundle: &str,
        _manifest: &str,
        _out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "install files",
        })
    }

    fn copy_file_to_device(
        &self,
        _bundle: &str,
        _source: &str,
        _destination: &str,
        _out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "copy files",
        })
    }

    fn install_ipa_on_device(
        &self,
        _ipa_path: &str,
        _out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "install packages",
        })
    }

    fn enumerate_connected_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError> {
        writeln!(out, "No device backend attached; 0 devices connected.")?;
        Ok(())
    }

    fn list_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError> {
        writeln!(out, "No device backend attached; no devices known.")?;
        Ok(())
    }

    fn tunnel_to_device(
        &self,
        _device: &str,
        _param: &str,
        _out: &mut dyn Write,
    ) -> Result<(), DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "tunnel to devices",
        })
    }

    fn listen_to_device(
        &self,
        _device: &str,
        _out: &mut dyn Write,
        _cancel: &CancellationToken,
    ) -> Result<(), DeployerError> {
        Err(DeployerError::Unavailable {
            operation: "listen to devices",
        })
    }
}
