//! Shared configuration for the deployment server and its client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then
//! configuration files, then `DEPLOY_*` environment variables, then command
//! line flags. Both binaries load the same [`Config`] so a client can forward
//! its flags to a server it launches.

mod defaults;
mod logging;
mod runtime;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_INACTIVITY_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_PORT, MIN_INACTIVITY_TIMEOUT_MS,
    default_log_filter, default_log_filter_string, default_log_format,
    floored_inactivity_timeout,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError, resolve_server_root};

/// Resolved configuration shared by `deployd` and `deploy`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DEPLOY")]
#[serde(default)]
pub struct Config {
    /// Loopback TCP port of the server.
    #[ortho_config(default = 41_000)]
    pub port: u16,
    /// Idle period, in milliseconds, before the server stops itself.
    #[ortho_config(default = 120_000)]
    pub inactivity_timeout_ms: u64,
    /// Identity the server reports to clients. Defaults to the directory of
    /// the running executable.
    pub server_root: Option<Utf8PathBuf>,
    /// Directory holding the lock files and the server log.
    pub runtime_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for server logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
            server_root: None,
            runtime_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Port the server listens on. Zero falls back to the default.
    #[must_use]
    pub const fn port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// Loopback address derived from [`Config::port`].
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.port()))
    }

    /// Inactivity timeout with the floor applied.
    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        floored_inactivity_timeout(self.inactivity_timeout_ms)
    }

    /// Explicitly configured server identity, if any.
    #[must_use]
    pub fn server_root(&self) -> Option<&Utf8Path> {
        self.server_root.as_deref()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
