use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use deploy_protocol::CommandRequest;
use tracing::{debug, info, warn};

use super::{DISPATCH_TARGET, ExecutionPermit, SessionSink, execute};
use crate::deployer::{CancellationToken, Deployer};

/// State of a running command as seen by its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerPoll {
    Finished(bool),
    Running,
}

/// Handle to a command running on its own thread.
pub(crate) struct CommandWorker {
    outcome: Receiver<bool>,
    cancel: CancellationToken,
    sink: SessionSink,
}

impl CommandWorker {
    /// Starts `request` on a new thread that owns `permit`.
    ///
    /// Streaming commands, which never wait for a terminal marker, release
    /// the permit as soon as the thread starts.
    pub(crate) fn spawn(
        session_id: u64,
        permit: ExecutionPermit,
        request: CommandRequest,
        deployer: Arc<dyn Deployer>,
        sink: SessionSink,
    ) -> io::Result<Self> {
        let (sender, outcome) = mpsc::channel();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let mut out = sink.clone();

        thread::Builder::new()
            .name(format!("deployd-worker-{session_id}"))
            .spawn(move || {
                let mut permit = Some(permit);
                if !request.kind.waits_for_marker() {
                    drop(permit.take());
                }
                info!(
                    target: DISPATCH_TARGET,
                    session = session_id,
                    command = %request.kind,
                    "command started"
                );
                let success = panic::catch_unwind(AssertUnwindSafe(|| {
                    execute(deployer.as_ref(), &request, &mut out, &worker_cancel)
                }))
                .unwrap_or_else(|_| {
                    warn!(
                        target: DISPATCH_TARGET,
                        session = session_id,
                        command = %request.kind,
                        "command panicked"
                    );
                    false
                });
                drop(permit);
                info!(
                    target: DISPATCH_TARGET,
                    session = session_id,
                    command = %request.kind,
                    success,
                    "command finished"
                );
                if sender.send(success).is_err() {
                    debug!(
                        target: DISPATCH_TARGET,
                        session = session_id,
                        "session abandoned its command before completion"
                    );
                }
            })?;

        Ok(Self {
            outcome,
            cancel,
            sink,
        })
    }

    /// Waits up to `wait` for the command to finish.
    pub(crate) fn poll(&self, wait: Duration) -> WorkerPoll {
        match self.outcome.recv_timeout(wait) {
            Ok(success) => WorkerPoll::Finished(success),
            Err(RecvTimeoutError::Timeout) => WorkerPoll::Running,
            Err(RecvTimeoutError::Disconnected) => WorkerPoll::Finished(false),
        }
    }

    /// Signals cancellation and cuts the worker off from the session. The
    /// thread is left to finish on its own.
    pub(crate) fn abandon(self) {
        self.cancel.cancel();
        self.sink.detach();
    }
}
