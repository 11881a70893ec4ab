//! Process-level concerns: the singleton lock, launch sequencing and
//! termination signals.

mod errors;
mod guard;
mod launch;
mod shutdown;

pub use errors::{GuardError, LaunchError};
pub use guard::SingletonGuard;
pub use launch::run_server;
#[cfg(test)]
pub(crate) use launch::run_server_with;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
