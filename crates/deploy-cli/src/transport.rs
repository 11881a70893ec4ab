//! Line-oriented connection to a deployment server.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use deploy_protocol::{TerminalStatus, parse_preamble, terminal_status};

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn connect(addr: SocketAddr) -> io::Result<TcpStream> {
    TcpStream::connect_timeout(&addr, CONNECTION_TIMEOUT)
}

/// Whether a connect error means nothing is listening.
pub(crate) fn is_server_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable | io::ErrorKind::NotFound
    )
}

/// How a forwarded response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseEnd {
    Marker(TerminalStatus),
    Closed,
}

pub(crate) struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Reads the identity preamble. `None` when the server closed first or
    /// sent something else.
    pub(crate) fn read_preamble(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        if self.reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(parse_preamble(&line).map(str::to_owned))
    }

    pub(crate) fn send(&mut self, encoded: &str) -> io::Result<()> {
        self.writer.write_all(encoded.as_bytes())?;
        self.writer.flush()
    }

    /// Copies response lines to `out` until a terminal marker or the end of
    /// the stream. The blank line that precedes a marker is not copied.
    pub(crate) fn forward_response(&mut self, out: &mut dyn Write) -> io::Result<ResponseEnd> {
        let mut raw = Vec::new();
        let mut pending_blank = false;
        loop {
            raw.clear();
            match self.reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::ConnectionReset => break,
                Err(error) => return Err(error),
            }
            // Device output is not guaranteed to be UTF-8.
            let line = String::from_utf8_lossy(&raw);
            let text = line.trim_end_matches(['\r', '\n']);
            if let Some(status) = terminal_status(text) {
                let prefix = &text[..text.len() - status.marker().len()];
                if !prefix.is_empty() {
                    writeln!(out, "{prefix}")?;
                }
                out.flush()?;
                return Ok(ResponseEnd::Marker(status));
            }
            if text.is_empty() {
                if pending_blank {
                    writeln!(out)?;
                }
                pending_blank = true;
                continue;
            }
            if pending_blank {
                writeln!(out)?;
                pending_blank = false;
            }
            writeln!(out, "{text}")?;
        }
        out.flush()?;
        Ok(ResponseEnd::Closed)
    }
}
