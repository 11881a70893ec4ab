//! Per-connection command sessions.
//!
//! A session announces the server identity, waits for one request line, runs
//! the command through the dispatcher and answers with a terminal marker.
//! Sessions also watch the shared state. Once the server is stopping, an
//! idle session leaves with `CMDOK`. A session whose request was already in
//! flight, or still waits for the execution slot, leaves with `CMDFAIL`. A
//! running session abandons its command with `CMDFAIL` when termination is
//! forced.

mod errors;
mod framing;
mod handler;

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use deploy_protocol::{CommandKind, CommandRequest, TerminalStatus, format_preamble};
use tracing::{debug, info, warn};

use crate::deployer::Deployer;
use crate::dispatch::{
    CommandWorker, Dispatcher, ExecutionPermit, Refusal, SessionSink, WorkerPoll,
};
use crate::lifecycle::{LifecycleSettings, ServerState};

pub use errors::SessionError;
pub(crate) use handler::SessionHandler;

use framing::{LineAssembler, is_timeout};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

const PROBE_TIMEOUT: Duration = Duration::from_millis(1);
const STOP_DRAIN_WINDOW: Duration = Duration::from_millis(100);
const STOPPING_MESSAGE: &str = "Deployment server stopping ...";

/// Position of a session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no request parsed yet.
    Idle,
    /// A request is parsed and waits for the execution slot.
    HasCommand,
    /// The command is executing.
    Running,
    /// A terminal marker was written.
    Completed,
    /// The connection failed or the peer left.
    Disconnected,
}

/// Everything a session needs from the server.
pub(crate) struct SessionContext {
    pub(crate) state: Arc<ServerState>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) deployer: Arc<dyn Deployer>,
    pub(crate) identity: String,
    pub(crate) settings: LifecycleSettings,
}

/// What a session found on the wire before running anything.
enum Inbound {
    Request(CommandRequest),
    /// Nothing pending; the server is stopping.
    Idle,
    /// A request or a partial line was pending when the server started
    /// stopping.
    Refused,
}

/// How a session ended.
#[derive(Debug)]
pub(crate) enum SessionOutcome {
    Completed(TerminalStatus),
    Disconnected(SessionError),
}

pub(crate) struct CommandSession {
    id: u64,
    stream: TcpStream,
    context: Arc<SessionContext>,
    state: SessionState,
    lines: LineAssembler,
}

impl CommandSession {
    pub(crate) fn new(id: u64, stream: TcpStream, context: Arc<SessionContext>) -> Self {
        Self {
            id,
            stream,
            context,
            state: SessionState::Idle,
            lines: LineAssembler::default(),
        }
    }

    pub(crate) fn run(mut self) -> SessionOutcome {
        let outcome = match self.drive() {
            Ok(status) => {
                self.state = SessionState::Completed;
                SessionOutcome::Completed(status)
            }
            Err(error) => {
                self.state = SessionState::Disconnected;
                SessionOutcome::Disconnected(error)
            }
        };
        debug!(
            target: SESSION_TARGET,
            session = self.id,
            state = ?self.state,
            "session finished"
        );
        if let Err(error) = self.stream.shutdown(Shutdown::Both) {
            debug!(
                target: SESSION_TARGET,
                session = self.id,
                error = %error,
                "socket shutdown failed"
            );
        }
        outcome
    }

    fn drive(&mut self) -> Result<TerminalStatus, SessionError> {
        let preamble = format_preamble(&self.context.identity);
        self.write_line(&preamble)?;

        let request = match self.await_request()? {
            Inbound::Request(request) => request,
            Inbound::Idle => return self.finish(TerminalStatus::Ok),
            Inbound::Refused => return self.finish(TerminalStatus::Fail),
        };
        if request.kind == CommandKind::Stop {
            return self.run_stop();
        }

        self.stream.set_read_timeout(Some(PROBE_TIMEOUT))?;
        match self.await_admission(&request)? {
            Some(permit) => self.run_command(permit, request),
            None => self.finish(TerminalStatus::Fail),
        }
    }

    /// Reads lines until one parses or the server starts stopping.
    fn await_request(&mut self) -> Result<Inbound, SessionError> {
        self.stream
            .set_read_timeout(Some(self.context.settings.poll_interval))?;
        loop {
            if self.context.state.is_stopping() {
                return self.drain_while_stopping();
            }
            let Some(line) = self.lines.read_line(&mut self.stream)? else {
                continue;
            };
            if let Some(request) = self.parse_line(&line) {
                self.accept_request(&request);
                return Ok(Inbound::Request(request));
            }
        }
    }

    /// Consumes input that is already on its way. Only a session with nothing
    /// pending is idle; a late `stop` joins the shutdown already under way.
    fn drain_while_stopping(&mut self) -> Result<Inbound, SessionError> {
        self.stream.set_read_timeout(Some(STOP_DRAIN_WINDOW))?;
        let mut pending = None;
        while let Some(line) = self.lines.read_line(&mut self.stream)? {
            if let Some(request) = self.parse_line(&line) {
                pending = Some(request.kind);
            }
        }
        match pending {
            Some(CommandKind::Stop) => Ok(Inbound::Idle),
            Some(kind) => {
                self.state = SessionState::HasCommand;
                info!(
                    target: SESSION_TARGET,
                    session = self.id,
                    command = %kind,
                    "server stopping; command refused"
                );
                Ok(Inbound::Refused)
            }
            None if self.lines.has_partial() => {
                info!(
                    target: SESSION_TARGET,
                    session = self.id,
                    "server stopping; incomplete request refused"
                );
                Ok(Inbound::Refused)
            }
            None => Ok(Inbound::Idle),
        }
    }

    fn parse_line(&self, line: &str) -> Option<CommandRequest> {
        match CommandRequest::parse(line) {
            Ok(request) => Some(request),
            Err(error) => {
                debug!(
                    target: SESSION_TARGET,
                    session = self.id,
                    error = %error,
                    "ignoring unparseable request"
                );
                None
            }
        }
    }

    fn accept_request(&mut self, request: &CommandRequest) {
        if request.keep_alive {
            self.context.state.touch();
        }
        if let Some(millis) = request.timeout_override {
            let effective = self
                .context
                .state
                .set_inactivity_timeout(Duration::from_millis(millis));
            debug!(
                target: SESSION_TARGET,
                session = self.id,
                timeout_ms = effective.as_millis(),
                "inactivity timeout updated"
            );
        }
        info!(
            target: SESSION_TARGET,
            session = self.id,
            command = %request.kind,
            keep_alive = request.keep_alive,
            "request received"
        );
        self.state = SessionState::HasCommand;
    }

    fn await_admission(
        &mut self,
        request: &CommandRequest,
    ) -> Result<Option<ExecutionPermit>, SessionError> {
        let poll_interval = self.context.settings.poll_interval;
        let mut logged_wait = false;
        loop {
            match self.context.dispatcher.admit_within(poll_interval) {
                Ok(permit) => return Ok(Some(permit)),
                Err(Refusal::Stopping) => {
                    info!(
                        target: SESSION_TARGET,
                        session = self.id,
                        command = %request.kind,
                        "server stopping; command refused"
                    );
                    return Ok(None);
                }
                Err(Refusal::Busy) => {
                    if !logged_wait {
                        debug!(
                            target: SESSION_TARGET,
                            session = self.id,
                            command = %request.kind,
                            "waiting for the execution slot"
                        );
                        logged_wait = true;
                    }
                    self.probe_peer(request.keep_alive)?;
                }
            }
        }
    }

    fn run_command(
        &mut self,
        permit: ExecutionPermit,
        request: CommandRequest,
    ) -> Result<TerminalStatus, SessionError> {
        let keep_alive = request.keep_alive;
        let sink = SessionSink::new(self.stream.try_clone()?);
        let worker = CommandWorker::spawn(
            self.id,
            permit,
            request,
            Arc::clone(&self.context.deployer),
            sink,
        )?;
        self.state = SessionState::Running;

        loop {
            match worker.poll(self.context.settings.poll_interval) {
                WorkerPoll::Finished(success) => {
                    if keep_alive {
                        self.context.state.touch();
                    }
                    return self.finish(TerminalStatus::from_success(success));
                }
                WorkerPoll::Running if self.context.state.is_terminating() => {
                    warn!(
                        target: SESSION_TARGET,
                        session = self.id,
                        "forced termination; abandoning running command"
                    );
                    worker.abandon();
                    return self.finish(TerminalStatus::Fail);
                }
                WorkerPoll::Running => {
                    if let Err(error) = self.probe_peer(keep_alive) {
                        info!(
                            target: SESSION_TARGET,
                            session = self.id,
                            error = %error,
                            "peer left; abandoning running command"
                        );
                        worker.abandon();
                        return Err(error);
                    }
                }
            }
        }
    }

    /// Handles `stop` inline, outside the execution slot.
    fn run_stop(&mut self) -> Result<TerminalStatus, SessionError> {
        self.state = SessionState::Running;
        self.write_line(STOPPING_MESSAGE)?;
        let state = &self.context.state;
        let first = state.request_stop();
        info!(
            target: SESSION_TARGET,
            session = self.id,
            first,
            "stop requested"
        );

        let deadline = Instant::now() + self.context.settings.stop_grace;
        if !state.wait_for_sessions_at_most(1, deadline) {
            warn!(
                target: SESSION_TARGET,
                session = self.id,
                remaining = state.snapshot().active_sessions.saturating_sub(1),
                "sessions still active after the grace period; forcing termination"
            );
            state.force_terminate();
        }
        self.finish(TerminalStatus::Ok)
    }

    /// Checks the peer without blocking: end of stream or a hard error means
    /// it is gone. Stray input is discarded; with keep-alive it still counts
    /// as activity.
    fn probe_peer(&mut self, keep_alive: bool) -> Result<(), SessionError> {
        let mut probe = [0_u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => Err(SessionError::Closed),
            Ok(_) => {
                let mut discard = [0_u8; 512];
                match self.stream.read(&mut discard) {
                    Ok(0) => return Err(SessionError::Closed),
                    Ok(_) => {}
                    Err(error) if is_timeout(&error) => {}
                    Err(error) => return Err(error.into()),
                }
                if keep_alive {
                    self.context.state.touch();
                }
                Ok(())
            }
            Err(error) if is_timeout(&error) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn finish(&mut self, status: TerminalStatus) -> Result<TerminalStatus, SessionError> {
        self.stream.write_all(status.wire_line().as_bytes())?;
        self.stream.flush()?;
        self.state = SessionState::Completed;
        Ok(status)
    }

    fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        writeln!(self.stream, "{line}")?;
        self.stream.flush()?;
        Ok(())
    }
}
