//! Process launcher.
//!
//! Spawns one service as a tokio child with piped stdout and stderr (captured
//! into an [`OutputBuffer`]) and null stdin. The process:
//! - Runs in its own process group (`process_group(0)`) so termination can
//!   signal the whole tree, and so a terminal Ctrl+C reaches only the
//!   supervisor, which then stops services in order
//! - Has `kill_on_drop(true)` as a safety net

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use super::output::{OutputBuffer, Stream};
use super::service::RunningService;
use crate::error::LaunchError;
use crate::registry::ServiceSpec;

/// Start the process described by `spec`. Does not retry.
///
/// Must be called from within a tokio runtime.
pub fn launch(spec: Arc<ServiceSpec>) -> Result<RunningService, LaunchError> {
    let (program, args) = spec
        .command
        .split_first()
        .ok_or_else(|| LaunchError::EmptyCommand {
            service: spec.name.clone(),
        })?;

    if !spec.working_directory.is_dir() {
        return Err(LaunchError::MissingDirectory {
            service: spec.name.clone(),
            path: spec.working_directory.clone(),
        });
    }

    tracing::info!(
        service = %spec.name,
        command = %spec.command.join(" "),
        dir = %spec.working_directory.display(),
        "Starting service"
    );

    let mut child = Command::new(program)
        .args(args)
        .current_dir(&spec.working_directory)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            service: spec.name.clone(),
            program: program.clone(),
            source,
        })?;

    // Never fall back to 0 here: killpg(0) would signal the supervisor's own group.
    let Some(pid) = child.id() else {
        return Err(LaunchError::Spawn {
            service: spec.name.clone(),
            program: program.clone(),
            source: std::io::Error::other("process has no pid after spawn"),
        });
    };

    let output = OutputBuffer::default();
    if let Some(stdout) = child.stdout.take() {
        output.spawn_reader(spec.name.clone(), Stream::Stdout, stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        output.spawn_reader(spec.name.clone(), Stream::Stderr, stderr);
    }

    tracing::debug!(service = %spec.name, pid, "Service process spawned");
    Ok(RunningService::new(spec, child, pid, output))
}
