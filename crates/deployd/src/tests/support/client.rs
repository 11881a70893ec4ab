//! Minimal protocol client for driving a live server in tests.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use deploy_protocol::{REQUEST_TERMINATOR, TerminalStatus, parse_preamble, terminal_status};

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a client saw for one request.
#[derive(Debug, Default)]
pub(crate) struct Reply {
    pub(crate) lines: Vec<String>,
    pub(crate) status: Option<TerminalStatus>,
}

pub(crate) struct TestClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TestClient {
    pub(crate) fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let writer = stream.try_clone().expect("clone client stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub(crate) fn read_preamble(&mut self) -> String {
        let line = self.read_line().expect("server sends a preamble");
        parse_preamble(&line)
            .unwrap_or_else(|| panic!("expected a preamble, got {line:?}"))
            .to_owned()
    }

    pub(crate) fn send(&mut self, line: &str) {
        write!(self.writer, "{line}{REQUEST_TERMINATOR}").expect("send request");
        self.writer.flush().expect("flush request");
    }

    /// Reads until a terminal marker or the end of the stream.
    pub(crate) fn read_reply(&mut self) -> Reply {
        let mut reply = Reply::default();
        while let Some(line) = self.read_line() {
            if let Some(status) = terminal_status(&line) {
                reply.status = Some(status);
                break;
            }
            if !line.is_empty() {
                reply.lines.push(line);
            }
        }
        reply
    }

    /// Whether the server has closed its side of the connection.
    pub(crate) fn is_closed(&mut self) -> bool {
        self.read_line().is_none()
    }

    /// Closes the connection without waiting for a reply.
    pub(crate) fn disconnect(self) {
        drop(self);
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
            Err(error) if error.kind() == ErrorKind::ConnectionReset => None,
            Err(error) => panic!("reading from test server failed: {error}"),
        }
    }
}
