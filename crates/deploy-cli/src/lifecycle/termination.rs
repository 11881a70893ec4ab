//! Kills leftover server processes by name.

use std::env;
use std::ffi::OsStr;

use sysinfo::{ProcessesToUpdate, System};

const SERVER_PROCESS: &str = "deployd";

/// Kills every process named `deployd` other than this one. Returns how many
/// were signalled.
pub(super) fn kill_server_processes() -> usize {
    let own_pid = sysinfo::get_current_pid().ok();
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
        .processes()
        .iter()
        .filter(|(pid, _)| Some(**pid) != own_pid)
        .filter(|(_, process)| is_server_process(process.name()))
        .filter(|(_, process)| process.kill())
        .count()
}

fn is_server_process(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    let stem = name
        .strip_suffix(env::consts::EXE_SUFFIX)
        .unwrap_or(&name);
    stem.eq_ignore_ascii_case(SERVER_PROCESS)
}
