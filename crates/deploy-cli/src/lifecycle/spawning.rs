//! Server process spawning.
//!
//! The binary comes from an explicit override, then `DEPLOYD_BIN`, then a
//! `deployd` executable next to the running client, then `PATH`.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use super::error::LifecycleError;

pub(crate) const SERVER_BIN_ENV: &str = "DEPLOYD_BIN";
const SERVER_BINARY: &str = "deployd";

pub(super) fn resolve_server_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(SERVER_BIN_ENV))
        .or_else(sibling_binary)
        .unwrap_or_else(|| OsString::from(SERVER_BINARY))
}

fn sibling_binary() -> Option<OsString> {
    let executable = env::current_exe().ok()?;
    let candidate = executable
        .parent()?
        .join(format!("{SERVER_BINARY}{}", env::consts::EXE_SUFFIX));
    candidate.is_file().then(|| candidate.into_os_string())
}

/// Spawns the server detached from the client's terminal, appending its
/// output to `log_path`.
pub(super) fn spawn_server(
    binary: &OsStr,
    arguments: &[OsString],
    log_path: &Path,
) -> Result<Child, LifecycleError> {
    let open_log = || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|source| LifecycleError::OpenLog {
                path: log_path.to_path_buf(),
                source,
            })
    };
    let stdout = open_log()?;
    let stderr = open_log()?;

    Command::new(binary)
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(|source| LifecycleError::LaunchServer {
            binary: binary.to_owned(),
            source,
        })
}
