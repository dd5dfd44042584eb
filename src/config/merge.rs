use super::schema::{AppConfig, PartialConfig};
use crate::error::ConfigError;
use crate::registry::defaults::default_services;
use std::path::PathBuf;

pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_PROBE_ATTEMPT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    /// For services: REPLACE semantics (if self has Some, use it entirely).
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            root: self.root.or(fallback.root),
            probe_interval_secs: self.probe_interval_secs.or(fallback.probe_interval_secs),
            probe_attempt_timeout_secs: self
                .probe_attempt_timeout_secs
                .or(fallback.probe_attempt_timeout_secs),
            grace_period_secs: self.grace_period_secs.or(fallback.grace_period_secs),
            timeout_override_secs: self.timeout_override_secs.or(fallback.timeout_override_secs),
            services: self.services.or(fallback.services),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            root: self.root.unwrap_or_else(|| PathBuf::from(".")),
            probe_interval_secs: self
                .probe_interval_secs
                .unwrap_or(DEFAULT_PROBE_INTERVAL_SECS),
            probe_attempt_timeout_secs: self
                .probe_attempt_timeout_secs
                .unwrap_or(DEFAULT_PROBE_ATTEMPT_TIMEOUT_SECS),
            grace_period_secs: self.grace_period_secs.unwrap_or(DEFAULT_GRACE_PERIOD_SECS),
            timeout_override_secs: self.timeout_override_secs,
            services: self.services.unwrap_or_else(default_services),
        }
    }
}

impl AppConfig {
    /// Reject settings that would make health checking spin or time out
    /// before the first attempt. A zero grace period is allowed and means
    /// SIGKILL right after SIGTERM.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("probe_interval_secs", self.probe_interval_secs),
            ("probe_attempt_timeout_secs", self.probe_attempt_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must be at least 1 second".to_string(),
                });
            }
        }
        if self.timeout_override_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                message: "must be at least 1 second".to_string(),
            });
        }
        if let Some(entry) = self.services.iter().find(|s| s.timeout_secs == Some(0)) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                message: format!("service `{}` must allow at least 1 second", entry.name),
            });
        }
        Ok(())
    }
}
