//! Starting, replacing and killing `deployd` on behalf of the client.
//!
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`spawning`] resolves the server binary and spawns it.
//! - [`socket`] connects with a bounded retry and waits for a port to free up.
//! - [`termination`] kills leftover server processes.
//! - [`launch`] ties these together behind [`ServerLauncher`].

mod error;
mod launch;
mod socket;
mod spawning;
mod termination;

pub(crate) use error::LifecycleError;
pub(crate) use launch::{LaunchPlan, ServerLauncher, SystemLauncher};
pub(crate) use socket::{RetryPolicy, wait_for_release};
