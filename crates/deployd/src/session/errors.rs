use std::io;

use thiserror::Error;

/// Transport failures that end a session as disconnected.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer closed its end of the connection.
    #[error("peer closed the connection")]
    Closed,
    /// A request line exceeded the framing limit.
    #[error("request line exceeds {limit} bytes")]
    RequestTooLong {
        /// Maximum accepted line length in bytes.
        limit: usize,
    },
    /// Reading from or writing to the connection failed.
    #[error("connection I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for SessionError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}
