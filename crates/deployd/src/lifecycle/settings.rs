use std::time::Duration;

use deploy_config::{Config, MIN_INACTIVITY_TIMEOUT_MS};

/// Timing knobs for the lifecycle of one server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Idle period after which a server without sessions stops.
    pub inactivity_timeout: Duration,
    /// Floor applied to every inactivity timeout, including `-timeout`.
    pub min_inactivity_timeout: Duration,
    /// How long `stop` waits for other sessions before forcing termination.
    pub stop_grace: Duration,
    /// Upper bound on how long any wait loop sleeps between checks.
    pub poll_interval: Duration,
}

impl LifecycleSettings {
    /// Settings derived from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            inactivity_timeout: config.inactivity_timeout(),
            ..Self::default()
        }
    }

    /// Applies the floor to a requested timeout.
    #[must_use]
    pub fn floored(&self, requested: Duration) -> Duration {
        requested.max(self.min_inactivity_timeout)
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_millis(
                deploy_config::DEFAULT_INACTIVITY_TIMEOUT_MS,
            ),
            min_inactivity_timeout: Duration::from_millis(MIN_INACTIVITY_TIMEOUT_MS),
            stop_grace: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}
