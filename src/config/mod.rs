pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// File name looked up in the root directory and the global config directory.
pub const CONFIG_FILE_NAME: &str = "herd.toml";

/// Load configuration by merging global, root-directory, and CLI sources.
/// Precedence: CLI > root config (or explicit --config) > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply). An explicit
/// `--config` path must exist and parse.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    // Layer 1: Global config (~/.config/herd/herd.toml or platform equivalent)
    let global = load_global_config();

    // Determine the root directory from CLI or global config, for loading the root config.
    let root = cli_root(cli)
        .or_else(|| global.root.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    // Layer 2: Explicit config file, or root/herd.toml
    let local = match cli_config_path(cli) {
        Some(path) => read_toml_file(path)?,
        None => load_root_config(&root),
    };

    // Layer 3: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    // Merge: CLI > root > global > defaults
    let config = cli_partial
        .with_fallback(local)
        .with_fallback(global)
        .finalize();
    config.validate()?;

    Ok(config)
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if the file is missing or unreadable.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

fn load_root_config(root: &Path) -> PartialConfig {
    load_toml_file(&root.join(CONFIG_FILE_NAME)).unwrap_or_default()
}

/// Load a discovered config file. Not-found is silent; other problems are
/// logged and the file is skipped.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match read_toml_file(path) {
        Ok(partial) => Some(partial),
        Err(ConfigError::IoError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Ignoring config file: {e}");
            None
        }
    }
}

/// Read and parse a TOML config file into a PartialConfig.
pub fn read_toml_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let config_file =
        toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config_file.to_partial())
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/herd/herd.toml
/// macOS: ~/Library/Application Support/herd/herd.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "herd")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn cli_root(cli: &Cli) -> Option<PathBuf> {
    match &cli.command {
        Commands::Up { root, .. } | Commands::List { root, .. } => root.clone(),
    }
}

fn cli_config_path(cli: &Cli) -> Option<&Path> {
    match &cli.command {
        Commands::Up { config, .. } | Commands::List { config, .. } => config.as_deref(),
    }
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    match &cli.command {
        Commands::Up {
            root,
            probe_interval,
            grace,
            timeout,
            ..
        } => PartialConfig {
            root: root.clone(),
            probe_interval_secs: *probe_interval,
            grace_period_secs: *grace,
            timeout_override_secs: *timeout,
            ..Default::default()
        },
        Commands::List { root, .. } => PartialConfig {
            root: root.clone(),
            ..Default::default()
        },
    }
}
