use std::net::{SocketAddr, TcpStream};

/// Handles accepted connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection to completion on the calling thread.
    /// Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream, peer: SocketAddr);
}
