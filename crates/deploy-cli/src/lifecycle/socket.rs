//! Connection retry and port release helpers.

use std::net::{SocketAddr, TcpStream};
use std::process::Child;
use std::thread;
use std::time::Duration;

use crate::transport::{connect, is_server_absent};

use super::error::LifecycleError;

/// How often and how patiently to try connecting to a starting server.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) attempts: u32,
    pub(crate) interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(300),
        }
    }
}

/// Connects to `addr`, retrying per `policy`. A spawned `child` that exits
/// unsuccessfully ends the wait early.
pub(super) fn connect_with_retry(
    addr: SocketAddr,
    policy: RetryPolicy,
    mut child: Option<&mut Child>,
) -> Result<TcpStream, LifecycleError> {
    let mut attempt = 1;
    loop {
        let error = match connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(error) => error,
        };
        if let Some(child) = child.as_deref_mut()
            && let Some(status) = child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?
            && !status.success()
        {
            return Err(LifecycleError::StartupFailed {
                exit_status: status.code(),
            });
        }
        if attempt >= policy.attempts {
            return Err(LifecycleError::ConnectTimeout {
                addr,
                attempts: policy.attempts,
                source: error,
            });
        }
        attempt += 1;
        thread::sleep(policy.interval);
    }
}

/// Waits until nothing accepts connections on `addr`, for at most
/// `attempts × interval`. Returns whether the port was released.
pub(crate) fn wait_for_release(addr: SocketAddr, policy: RetryPolicy) -> bool {
    for attempt in 1..=policy.attempts {
        match connect(addr) {
            Err(error) if is_server_absent(&error) => return true,
            _ if attempt < policy.attempts => thread::sleep(policy.interval),
            _ => {}
        }
    }
    false
}
