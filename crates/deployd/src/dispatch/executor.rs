//! Maps parsed commands onto [`Deployer`] calls.

use std::io::Write;

use deploy_protocol::{CommandKind, CommandRequest};
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use crate::deployer::{CancellationToken, Deployer, DeployerError};

const MIN_DEVICE_ID_LEN: usize = 5;

/// Runs `request` against `deployer`, writing progress to `out`.
///
/// Returns whether the command succeeded. Backend errors are written as
/// `error: <message>` and count as failure. `stop` has no backend effect and
/// always succeeds here; sessions intercept it before dispatch.
pub(crate) fn execute(
    deployer: &dyn Deployer,
    request: &CommandRequest,
    out: &mut dyn Write,
    cancel: &CancellationToken,
) -> bool {
    let device = request.device.as_deref().unwrap_or_default();
    deployer.set_device_id(device);

    match run(deployer, request, out, cancel) {
        Ok(success) => success,
        Err(error) => {
            warn!(
                target: DISPATCH_TARGET,
                command = %request.kind,
                error = %error,
                "command failed"
            );
            report(out, &format!("error: {error}"));
            false
        }
    }
}

fn run(
    deployer: &dyn Deployer,
    request: &CommandRequest,
    out: &mut dyn Write,
    cancel: &CancellationToken,
) -> Result<bool, DeployerError> {
    let bundle = request.bundle.as_deref().unwrap_or_default();
    let device = request.device.as_deref().unwrap_or_default();

    match request.kind {
        CommandKind::Stop => Ok(true),
        CommandKind::Backup => deployer.backup_files(bundle, &request.files, out),
        CommandKind::Deploy => deployer.install_files_on_device(
            bundle,
            request.manifest.as_deref().unwrap_or_default(),
            out,
        ),
        CommandKind::CopyFile => match request.files.as_slice() {
            [source, destination, ..] => {
                deployer.copy_file_to_device(bundle, source, destination, out)
            }
            _ => {
                report(out, "error: copyfile needs a source and a destination file");
                Ok(false)
            }
        },
        CommandKind::Install => {
            deployer.install_ipa_on_device(request.ipa_path.as_deref().unwrap_or_default(), out)
        }
        CommandKind::Enumerate => deployer.enumerate_connected_devices(out).map(|()| true),
        CommandKind::ListDevices => deployer.list_devices(out).map(|()| true),
        CommandKind::Tunnel => {
            tunnel(deployer, device, request.param.as_deref().unwrap_or_default(), out);
            Ok(true)
        }
        CommandKind::ListenToDevice => {
            if device.len() < MIN_DEVICE_ID_LEN {
                report(out, "Device ID not present.");
                return Ok(true);
            }
            deployer.listen_to_device(device, out, cancel).map(|()| true)
        }
    }
}

/// Tunnel failures are reported to the client but never fail the command.
fn tunnel(deployer: &dyn Deployer, device: &str, param: &str, out: &mut dyn Write) {
    if device.len() < MIN_DEVICE_ID_LEN {
        report(out, "Device ID not present.");
    } else if param.is_empty() {
        report(out, "Parameter not present.");
    } else if let Err(error) = deployer.tunnel_to_device(device, param, out) {
        warn!(
            target: DISPATCH_TARGET,
            device,
            error = %error,
            "tunnel to device failed"
        );
        report(out, "Errors encountered while tunneling to device.");
    }
}

fn report(out: &mut dyn Write, line: &str) {
    if let Err(error) = writeln!(out, "{line}") {
        debug!(
            target: DISPATCH_TARGET,
            error = %error,
            "dropping command output"
        );
    }
}
