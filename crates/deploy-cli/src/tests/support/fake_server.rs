//! A scripted stand-in for `deployd`.
//!
//! Serves a fixed number of connections: each gets the identity preamble,
//! has its request line recorded, and receives the scripted reply before the
//! connection closes. The listener closes once the last connection is served.

use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(10);

/// What a fake server says and how many connections it serves.
#[derive(Debug, Clone)]
pub(in crate::tests) struct ServerScript {
    pub(in crate::tests) identity: String,
    pub(in crate::tests) reply: Vec<String>,
    pub(in crate::tests) connections: usize,
}

impl ServerScript {
    /// Prints `line`, then the marker for `status` (`ok`, `fail` or
    /// `nothing`).
    pub(in crate::tests) fn new(identity: &str, line: &str, status: &str) -> Self {
        let mut reply = vec![String::from(line)];
        match status {
            "ok" => reply.extend([String::new(), String::from("CMDOK")]),
            "fail" => reply.extend([String::new(), String::from("CMDFAIL")]),
            "nothing" => {}
            other => panic!("unknown status {other}"),
        }
        Self {
            identity: String::from(identity),
            reply,
            connections: 1,
        }
    }
}

pub(in crate::tests) struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    pub(in crate::tests) fn spawn(script: ServerScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let addr = listener.local_addr().context("local addr")?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for _ in 0..script.connections {
                match accept(&listener) {
                    Ok(stream) => {
                        if let Ok(request) = serve(stream, &script) {
                            if let Ok(mut guard) = recorded.lock() {
                                guard.push(request);
                            }
                        }
                    }
                    Err(_) => return,
                }
            }
        });
        Ok(Self {
            addr,
            requests,
            handle: Some(handle),
        })
    }

    pub(in crate::tests) const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for every scripted connection and returns the recorded
    /// requests, terminators stripped.
    pub(in crate::tests) fn take_requests(&mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?;
        }
        let guard = self
            .requests
            .lock()
            .map_err(|_| anyhow!("request log poisoned"))?;
        Ok(guard.clone())
    }
}

fn accept(listener: &TcpListener) -> io::Result<TcpStream> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(io::Error::new(ErrorKind::TimedOut, "no client connected"));
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error),
        }
    }
}

fn serve(stream: TcpStream, script: &ServerScript) -> io::Result<String> {
    stream.set_read_timeout(Some(ACCEPT_DEADLINE))?;
    let mut writer = stream.try_clone()?;
    writeln!(writer, "DIR{}", script.identity)?;
    writer.flush()?;

    let mut reader = BufReader::new(stream);
    let mut request = Vec::new();
    reader.read_until(b'\r', &mut request)?;
    let request = String::from_utf8_lossy(&request)
        .trim_end_matches('\r')
        .to_owned();

    for line in &script.reply {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(request)
}
