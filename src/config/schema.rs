use serde::Deserialize;
use std::path::PathBuf;

/// The TOML file structure for herd.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub supervisor: Option<SupervisorConfig>,
    /// `[[service]]` tables. If specified, fully replaces the built-in registry.
    pub service: Option<Vec<ServiceEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct SupervisorConfig {
    pub root: Option<String>,
    pub probe_interval_secs: Option<u64>,
    pub probe_attempt_timeout_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
}

/// One service as declared in config (or in the built-in defaults).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub command: Vec<String>,
    /// Working directory, relative to the root directory unless absolute.
    pub dir: PathBuf,
    pub health_url: String,
    pub timeout_secs: Option<u64>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root: PathBuf,
    pub probe_interval_secs: u64,
    pub probe_attempt_timeout_secs: u64,
    pub grace_period_secs: u64,
    /// Applied to every service in place of its own timeout.
    pub timeout_override_secs: Option<u64>,
    pub services: Vec<ServiceEntry>,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub root: Option<PathBuf>,
    pub probe_interval_secs: Option<u64>,
    pub probe_attempt_timeout_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
    pub timeout_override_secs: Option<u64>,
    pub services: Option<Vec<ServiceEntry>>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let supervisor = self.supervisor;
        PartialConfig {
            root: supervisor
                .as_ref()
                .and_then(|s| s.root.as_ref())
                .map(PathBuf::from),
            probe_interval_secs: supervisor.as_ref().and_then(|s| s.probe_interval_secs),
            probe_attempt_timeout_secs: supervisor
                .as_ref()
                .and_then(|s| s.probe_attempt_timeout_secs),
            grace_period_secs: supervisor.as_ref().and_then(|s| s.grace_period_secs),
            timeout_override_secs: None,
            // An empty array is treated as "not specified".
            services: self.service.filter(|services| !services.is_empty()),
        }
    }
}
