//! Client side of a command exchange.
//!
//! Connects (launching a server when none is listening), checks the server's
//! identity, sends one request line and relays the response until a terminal
//! marker.

use std::net::{SocketAddr, TcpStream};
use std::process::ExitCode;

use deploy_protocol::{CommandKind, encode_command_line};

use crate::lifecycle::{RetryPolicy, ServerLauncher, wait_for_release};
use crate::transport::{self, Connection, ResponseEnd, is_server_absent};
use crate::{AppError, IoStreams};

const STOP_COMMAND: &str = "stop";

/// Runs one command against the server at `addr`.
pub(crate) struct ClientDriver<'a> {
    addr: SocketAddr,
    expected_identity: &'a str,
    launcher: &'a mut dyn ServerLauncher,
    release: RetryPolicy,
}

impl<'a> ClientDriver<'a> {
    pub(crate) fn new(
        addr: SocketAddr,
        expected_identity: &'a str,
        launcher: &'a mut dyn ServerLauncher,
    ) -> Self {
        Self {
            addr,
            expected_identity,
            launcher,
            release: RetryPolicy::default(),
        }
    }

    pub(crate) fn run(
        &mut self,
        kind: CommandKind,
        tokens: &[String],
        io: &mut IoStreams<'_>,
    ) -> Result<ExitCode, AppError> {
        let Some(stream) = self.open(kind, io)? else {
            return Ok(ExitCode::SUCCESS);
        };
        let (mut connection, identity) = Self::handshake(stream)?;
        if kind.needs_identity_check() && !identity.eq_ignore_ascii_case(self.expected_identity) {
            connection = self.replace_server(connection, io)?;
        }

        connection
            .send(&encode_command_line(tokens))
            .map_err(AppError::Transport)?;
        let end = connection
            .forward_response(&mut *io.stdout)
            .map_err(AppError::Transport)?;

        match end {
            ResponseEnd::Marker(status) => Ok(exit_code(status.is_success())),
            ResponseEnd::Closed if !kind.waits_for_marker() => Ok(ExitCode::SUCCESS),
            ResponseEnd::Closed => {
                writeln!(
                    io.stderr,
                    "Deployment server closed the connection before reporting a result."
                )
                .map_err(AppError::Output)?;
                Ok(ExitCode::FAILURE)
            }
        }
    }

    /// Connects, launching a server if nothing listens. `None` means a stop
    /// request found nothing to stop.
    fn open(
        &mut self,
        kind: CommandKind,
        io: &mut IoStreams<'_>,
    ) -> Result<Option<TcpStream>, AppError> {
        match transport::connect(self.addr) {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if is_server_absent(&error) => {
                if kind == CommandKind::Stop {
                    writeln!(io.stdout, "Deployment server not running ...")
                        .map_err(AppError::Output)?;
                    self.launcher.kill_servers();
                    return Ok(None);
                }
                Ok(Some(self.launcher.launch()?))
            }
            Err(source) => Err(AppError::Connect {
                addr: self.addr,
                source,
            }),
        }
    }

    fn handshake(stream: TcpStream) -> Result<(Connection, String), AppError> {
        let mut connection = Connection::new(stream).map_err(AppError::Transport)?;
        let identity = connection
            .read_preamble()
            .map_err(AppError::Transport)?
            .ok_or(AppError::MissingPreamble)?;
        Ok((connection, identity))
    }

    /// Stops a server that serves another root and starts a fresh one.
    fn replace_server(
        &mut self,
        mut connection: Connection,
        io: &mut IoStreams<'_>,
    ) -> Result<Connection, AppError> {
        writeln!(io.stdout, "Wrong server running, restarting the server ...")
            .map_err(AppError::Output)?;
        connection
            .send(&encode_command_line(&[STOP_COMMAND]))
            .map_err(AppError::Transport)?;
        connection
            .forward_response(&mut *io.stdout)
            .map_err(AppError::Transport)?;
        drop(connection);

        self.launcher.kill_servers();
        wait_for_release(self.addr, self.release);
        let stream = self.launcher.launch()?;
        Ok(Self::handshake(stream)?.0)
    }
}

pub(crate) const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
