//! A launcher that starts fake servers instead of spawning processes.

use std::cell::RefCell;
use std::net::TcpStream;
use std::rc::Rc;

use crate::lifecycle::{LifecycleError, ServerLauncher};

use super::fake_server::{FakeServer, ServerScript};

/// What the client asked the launcher to do.
#[derive(Default)]
pub(in crate::tests) struct LauncherLog {
    pub(in crate::tests) launches: usize,
    pub(in crate::tests) kills: usize,
    pub(in crate::tests) launched: Vec<FakeServer>,
}

pub(in crate::tests) struct FakeLauncher {
    script: ServerScript,
    log: Rc<RefCell<LauncherLog>>,
}

impl FakeLauncher {
    /// Every launch starts a fresh server following `script`.
    pub(in crate::tests) const fn new(script: ServerScript, log: Rc<RefCell<LauncherLog>>) -> Self {
        Self { script, log }
    }
}

impl ServerLauncher for FakeLauncher {
    fn launch(&mut self) -> Result<TcpStream, LifecycleError> {
        let server = FakeServer::spawn(self.script.clone()).expect("fake server should start");
        let addr = server.addr();
        let mut log = self.log.borrow_mut();
        log.launches += 1;
        log.launched.push(server);
        TcpStream::connect(addr).map_err(|source| LifecycleError::ConnectTimeout {
            addr,
            attempts: 1,
            source,
        })
    }

    fn kill_servers(&mut self) -> usize {
        self.log.borrow_mut().kills += 1;
        0
    }
}
