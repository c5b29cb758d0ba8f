//! Reconciliation worker schedule

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between reconciliation passes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Warn about subscriptions expiring between `start` and `end` hours from now
    #[serde(default = "default_warning_window_start")]
    pub warning_window_start_hours: i64,

    #[serde(default = "default_warning_window_end")]
    pub warning_window_end_hours: i64,

    /// How long a sent warning suppresses repeats
    #[serde(default = "default_warning_ttl")]
    pub warning_ttl_hours: u64,
}

impl WorkerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn warning_window(&self) -> (chrono::Duration, chrono::Duration) {
        (
            chrono::Duration::hours(self.warning_window_start_hours),
            chrono::Duration::hours(self.warning_window_end_hours),
        )
    }

    pub fn warning_ttl(&self) -> Duration {
        Duration::from_secs(self.warning_ttl_hours * 3600)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidWorkerInterval);
        }
        if self.warning_window_start_hours < 0
            || self.warning_window_start_hours >= self.warning_window_end_hours
        {
            return Err(ValidationError::InvalidWarningWindow);
        }
        // A TTL shorter than the window would let the next pass warn again.
        if (self.warning_ttl_hours as i64) < self.warning_window_end_hours {
            return Err(ValidationError::WarningTtlTooShort);
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            warning_window_start_hours: default_warning_window_start(),
            warning_window_end_hours: default_warning_window_end(),
            warning_ttl_hours: default_warning_ttl(),
        }
    }
}

fn default_interval() -> u64 {
    3600
}

fn default_warning_window_start() -> i64 {
    23
}

fn default_warning_window_end() -> i64 {
    25
}

fn default_warning_ttl() -> u64 {
    48
}
