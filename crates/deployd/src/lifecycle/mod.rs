//! Process-wide runtime counters and the monitor that decides when the
//! server stops.

mod monitor;
mod settings;
mod state;

pub use monitor::ShutdownReason;
pub(crate) use monitor::LifecycleMonitor;
pub use settings::LifecycleSettings;
pub(crate) use state::Admission;
pub use state::{ServerState, SessionGuard, StateSnapshot};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
