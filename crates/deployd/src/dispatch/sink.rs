use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type SharedWriter = Arc<Mutex<Option<Box<dyn Write + Send>>>>;

/// Output handle given to a command worker.
///
/// Once detached, further writes fail with `BrokenPipe`, so an abandoned
/// worker can no longer interleave text with the session's final marker.
#[derive(Clone)]
pub(crate) struct SessionSink {
    writer: SharedWriter,
}

impl SessionSink {
    pub(crate) fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Some(Box::new(writer)))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Write + Send>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the underlying writer. Blocks until an in-flight write finishes.
    pub(crate) fn detach(&self) {
        drop(self.lock().take());
    }
}

impl Write for SessionSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.lock().as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "session no longer accepts output",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
