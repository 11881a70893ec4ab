use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use super::{CommandSession, SESSION_TARGET, SessionContext, SessionOutcome};
use crate::transport::ConnectionHandler;

/// Runs one [`CommandSession`] per accepted connection.
pub(crate) struct SessionHandler {
    context: Arc<SessionContext>,
    next_id: AtomicU64,
}

impl SessionHandler {
    pub(crate) const fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            next_id: AtomicU64::new(1),
        }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _active = self.context.state.open_session();
        info!(
            target: SESSION_TARGET,
            session = id,
            %peer,
            "client connected"
        );

        match CommandSession::new(id, stream, Arc::clone(&self.context)).run() {
            SessionOutcome::Completed(status) => info!(
                target: SESSION_TARGET,
                session = id,
                %peer,
                status = status.marker(),
                "client disconnected"
            ),
            SessionOutcome::Disconnected(error) => info!(
                target: SESSION_TARGET,
                session = id,
                %peer,
                reason = %error,
                "client dropped"
            ),
        }
    }
}
