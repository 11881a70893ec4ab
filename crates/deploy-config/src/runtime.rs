//! Runtime artefact paths shared by the client and the server.
//!
//! The server holds `deployd.lock` for its whole lifetime. A client that
//! launches a server holds `deployd-launch.lock` while doing so, and points
//! the server's output at `deployd.log`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::Config;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

const RUNTIME_NAMESPACE: &str = "deployd";

/// Canonical paths for runtime artefacts.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    server_lock_path: PathBuf,
    launch_lock_path: PathBuf,
    log_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the configuration and creates the
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::RuntimeDirectory`] when the directory
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = config
            .runtime_dir
            .as_ref()
            .map_or_else(default_runtime_directory, |dir| {
                dir.as_std_path().to_path_buf()
            });
        fs::create_dir_all(&runtime_dir).map_err(|source| RuntimePathsError::RuntimeDirectory {
            path: runtime_dir.clone(),
            source,
        })?;
        Ok(Self {
            server_lock_path: runtime_dir.join("deployd.lock"),
            launch_lock_path: runtime_dir.join("deployd-launch.lock"),
            log_path: runtime_dir.join("deployd.log"),
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Lock held by the running server.
    #[must_use]
    pub fn server_lock_path(&self) -> &Path {
        self.server_lock_path.as_path()
    }

    /// Lock held by a client while it launches a server.
    #[must_use]
    pub fn launch_lock_path(&self) -> &Path {
        self.launch_lock_path.as_path()
    }

    /// File receiving the output of a launched server.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }
}

/// Identity the server announces and the client expects.
///
/// Uses the configured `server_root` when present, otherwise the directory of
/// the running executable.
///
/// # Errors
///
/// Returns an error when the executable path cannot be determined or is not
/// valid UTF-8.
pub fn resolve_server_root(config: &Config) -> Result<Utf8PathBuf, RuntimePathsError> {
    if let Some(root) = config.server_root() {
        return Ok(root.to_path_buf());
    }
    let exe = env::current_exe().map_err(|source| RuntimePathsError::Executable { source })?;
    let dir = exe.parent().map_or_else(|| exe.clone(), Path::to_path_buf);
    Utf8PathBuf::from_path_buf(dir).map_err(|path| RuntimePathsError::NonUtf8 { path })
}

fn default_runtime_directory() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = runtime_dir() {
            dir.push(RUNTIME_NAMESPACE);
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        dir.push(format!("uid-{}", unsafe { geteuid() }));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push(RUNTIME_NAMESPACE);
        dir
    }
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The running executable could not be located.
    #[error("failed to locate the running executable: {source}")]
    Executable {
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A derived path was not valid UTF-8.
    #[error("path '{}' is not valid UTF-8", path.display())]
    NonUtf8 {
        /// Offending path.
        path: PathBuf,
    },
}
