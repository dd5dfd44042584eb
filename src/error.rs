use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::supervisor::lifecycle::TeardownReport;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Errors raised while turning configured service entries into a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No services configured")]
    Empty,

    #[error("Service name `{0}` is declared more than once")]
    DuplicateName(String),

    #[error("Service `{name}` has an invalid health URL `{url}`: {message}")]
    InvalidHealthUrl {
        name: String,
        url: String,
        message: String,
    },

    #[error("Service `{0}` has a zero startup timeout")]
    ZeroTimeout(String),
}

/// A service process could not be spawned.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("{service}: launch command is empty")]
    EmptyCommand { service: String },

    #[error("{service}: working directory {} does not exist", path.display())]
    MissingDirectory { service: String, path: PathBuf },

    #[error("{service}: failed to spawn `{program}`: {source}")]
    Spawn {
        service: String,
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub fn service(&self) -> &str {
        match self {
            Self::EmptyCommand { service }
            | Self::MissingDirectory { service, .. }
            | Self::Spawn { service, .. } => service,
        }
    }
}

/// A launched service never reached the healthy state.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{service} failed to start within {} seconds", timeout.as_secs_f64())]
    HealthTimeout { service: String, timeout: Duration },

    #[error("{service} exited before becoming healthy ({status})")]
    PrematureExit { service: String, status: String },

    #[error("{service}: startup interrupted")]
    Interrupted { service: String },
}

impl ProbeError {
    pub fn service(&self) -> &str {
        match self {
            Self::HealthTimeout { service, .. }
            | Self::PrematureExit { service, .. }
            | Self::Interrupted { service } => service,
        }
    }
}

/// A process could not be stopped, even by force. The process may be leaked.
#[derive(Debug, thiserror::Error)]
pub enum TerminationError {
    #[error("{service} (pid {pid}): force kill failed: {source}")]
    ForceKill {
        service: String,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("{service} (pid {pid}): failed to reap process: {source}")]
    Reap {
        service: String,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("{service} (pid {pid}): still running after SIGKILL")]
    Unreaped { service: String, pid: u32 },
}

/// Phase of startup in which the sequence was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Launch,
    Health,
    Interrupted,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Launch => "launch",
            Self::Health => "health",
            Self::Interrupted => "interrupted",
        })
    }
}

/// Root cause of a [`StartupFailure`].
#[derive(Debug, thiserror::Error)]
pub enum StartupCause {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Aggregate failure of `start_all`. By the time this is returned every
/// already-launched process has been through teardown.
#[derive(Debug, thiserror::Error)]
#[error("startup failed at {stage} stage for {service}: {cause}")]
pub struct StartupFailure {
    pub stage: StartupStage,
    pub service: String,
    #[source]
    pub cause: StartupCause,
    /// Last captured output lines of the failing service, oldest first.
    pub recent_output: Vec<String>,
    pub teardown: TeardownReport,
}

/// One or more services survived the stop sequence. The individual errors
/// are in `teardown.failures`.
#[derive(Debug, thiserror::Error)]
#[error("{} service(s) could not be stopped", teardown.failures.len())]
pub struct ShutdownFailure {
    pub teardown: TeardownReport,
}
