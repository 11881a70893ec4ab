//! Machine-wide singleton enforcement through an advisory file lock.
//!
//! The lock belongs to the open file description, so the operating system
//! drops it when the owning process dies, however abruptly.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use super::PROCESS_TARGET;
use super::errors::GuardError;

/// Exclusive hold on a lock file, released exactly once on drop.
#[derive(Debug)]
pub struct SingletonGuard {
    path: PathBuf,
    file: File,
}

impl SingletonGuard {
    /// Takes the lock at `path` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Conflict`] when another holder owns the lock,
    /// and other variants when the file cannot be opened or locked.
    pub fn try_acquire(path: &Path) -> Result<Self, GuardError> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(|source| GuardError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        if let Err(error) = file.try_lock_exclusive() {
            return Err(if is_contended(&error) {
                GuardError::Conflict {
                    path: path.to_path_buf(),
                }
            } else {
                GuardError::Lock {
                    path: path.to_path_buf(),
                    source: error,
                }
            });
        }

        debug!(
            target: PROCESS_TARGET,
            lock = %path.display(),
            "lock acquired"
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Writes `pid` into the lock file for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Record`] when the file cannot be rewritten.
    pub fn record_pid(&mut self, pid: u32) -> Result<(), GuardError> {
        let record = |file: &mut File| -> io::Result<()> {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            writeln!(file, "{pid}")?;
            file.sync_all()
        };
        record(&mut self.file).map_err(|source| GuardError::Record {
            path: self.path.clone(),
            source,
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SingletonGuard {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            warn!(
                target: PROCESS_TARGET,
                lock = %self.path.display(),
                error = %error,
                "failed to release lock"
            );
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
