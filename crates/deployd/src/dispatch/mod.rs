//! Serialized command execution.
//!
//! At most one command runs at any instant across all sessions. A session
//! holding a parsed command asks the [`Dispatcher`] for the execution slot;
//! the returned [`ExecutionPermit`] moves into the worker thread that runs the
//! command, so the slot stays taken until the backend call really returns,
//! even when the session that started it has already gone.
//!
//! `stop` never passes through here; sessions handle it inline so shutdown
//! stays responsive while another command is running.

mod admission;
mod executor;
mod sink;
mod worker;

pub use admission::{Dispatcher, ExecutionPermit};
pub(crate) use admission::Refusal;
pub(crate) use executor::execute;
pub(crate) use sink::SessionSink;
pub(crate) use worker::{CommandWorker, WorkerPoll};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
