//! Splits the inbound byte stream into request lines.

use std::io::{self, Read};

use super::errors::SessionError;

/// Longest request line accepted, terminator excluded.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

const CHUNK_BYTES: usize = 2048;

/// Whether an I/O error only means that a read timeout elapsed.
pub(crate) fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Buffers partial input until a `\r` or `\n` terminates a line.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    /// Returns the next non-empty line, or `None` when the reader timed out
    /// before one was complete.
    pub(crate) fn read_line<R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<String>, SessionError> {
        let mut chunk = [0_u8; CHUNK_BYTES];
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Some(line));
            }
            match reader.read(&mut chunk) {
                Ok(0) => return Err(SessionError::Closed),
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) if is_timeout(&error) => return Ok(None),
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Whether bytes of an unterminated line are buffered.
    pub(crate) fn has_partial(&self) -> bool {
        self.buffer.iter().any(|byte| !byte.is_ascii_whitespace())
    }

    fn take_line(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            let Some(end) = self
                .buffer
                .iter()
                .position(|byte| matches!(byte, b'\r' | b'\n'))
            else {
                if self.buffer.len() > MAX_REQUEST_BYTES {
                    return Err(SessionError::RequestTooLong {
                        limit: MAX_REQUEST_BYTES,
                    });
                }
                return Ok(None);
            };
            if end > MAX_REQUEST_BYTES {
                return Err(SessionError::RequestTooLong {
                    limit: MAX_REQUEST_BYTES,
                });
            }

            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_owned()));
            }
        }
    }
}
