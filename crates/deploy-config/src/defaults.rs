use std::time::Duration;

use crate::logging::LogFormat;

/// Loopback port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 41_000;

/// Idle period after which a server with no sessions stops itself.
pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 120_000;

/// Lower bound applied to every configured or requested inactivity timeout.
pub const MIN_INACTIVITY_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    String::from(DEFAULT_LOG_FILTER)
}

/// Default logging format for the binaries.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Applies the inactivity floor to a timeout expressed in milliseconds.
pub fn floored_inactivity_timeout(millis: u64) -> Duration {
    Duration::from_millis(millis.max(MIN_INACTIVITY_TIMEOUT_MS))
}
