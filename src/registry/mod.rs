//! Ordered, immutable set of service descriptors.
//!
//! Registry order is significant: services are launched and probed in
//! declaration order and stopped in reverse.

pub mod defaults;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;

use crate::config::{AppConfig, ServiceEntry};
use crate::error::RegistryError;
use defaults::DEFAULT_TIMEOUT_SECS;

/// Static description of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub working_directory: PathBuf,
    pub health_url: Url,
    /// Maximum time allowed to become healthy.
    pub timeout: Duration,
}

impl ServiceSpec {
    pub fn new(
        name: impl Into<String>,
        command: Vec<String>,
        working_directory: impl Into<PathBuf>,
        health_url: Url,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            working_directory: working_directory.into(),
            health_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL shown to the operator: the health URL without a trailing `/health`.
    pub fn display_url(&self) -> String {
        let url = self.health_url.as_str();
        url.strip_suffix("/health")
            .or_else(|| url.strip_suffix("/health/"))
            .unwrap_or(url)
            .to_string()
    }

    fn summary(&self) -> ServiceSummary<'_> {
        ServiceSummary {
            name: &self.name,
            command: &self.command,
            working_directory: &self.working_directory,
            health_url: self.health_url.as_str(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

#[derive(Serialize)]
struct ServiceSummary<'a> {
    name: &'a str,
    command: &'a [String],
    working_directory: &'a Path,
    health_url: &'a str,
    timeout_secs: u64,
}

/// Validated, ordered list of services with unique names.
#[derive(Debug, Clone)]
pub struct Registry {
    services: Vec<Arc<ServiceSpec>>,
}

impl Registry {
    /// Build a registry, rejecting an empty list, duplicate names and zero
    /// startup timeouts.
    pub fn new(specs: Vec<ServiceSpec>) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateName(spec.name.clone()));
            }
            if spec.timeout.is_zero() {
                return Err(RegistryError::ZeroTimeout(spec.name.clone()));
            }
        }
        Ok(Self {
            services: specs.into_iter().map(Arc::new).collect(),
        })
    }

    /// Resolve configured entries: parse health URLs, anchor relative
    /// directories at `config.root`, and apply timeout defaults/overrides.
    pub fn from_config(config: &AppConfig) -> Result<Self, RegistryError> {
        let specs = config
            .services
            .iter()
            .map(|entry| resolve_entry(entry, &config.root, config.timeout_override_secs))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceSpec>> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ServiceSpec>> {
        self.services.iter().find(|spec| spec.name == name)
    }

    /// JSON array of the services in startup order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let summaries: Vec<_> = self.services.iter().map(|spec| spec.summary()).collect();
        serde_json::to_string_pretty(&summaries)
    }
}

fn resolve_entry(
    entry: &ServiceEntry,
    root: &Path,
    timeout_override_secs: Option<u64>,
) -> Result<ServiceSpec, RegistryError> {
    let health_url = Url::parse(&entry.health_url).map_err(|e| RegistryError::InvalidHealthUrl {
        name: entry.name.clone(),
        url: entry.health_url.clone(),
        message: e.to_string(),
    })?;
    if !matches!(health_url.scheme(), "http" | "https") {
        return Err(RegistryError::InvalidHealthUrl {
            name: entry.name.clone(),
            url: entry.health_url.clone(),
            message: format!("unsupported scheme `{}`", health_url.scheme()),
        });
    }

    let timeout_secs = timeout_override_secs
        .or(entry.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(
        ServiceSpec::new(&entry.name, entry.command.clone(), root.join(&entry.dir), health_url)
            .with_timeout(Duration::from_secs(timeout_secs)),
    )
}
