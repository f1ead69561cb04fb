use crate::{config::BenchConfig, signal, workload::CollisionMode};
use std::{
    io::Read,
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, trace, warn};
use tracing_unwrap::OptionExt;
use wait_timeout::ChildExt;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to reset the persisted database state")]
    ResetState(#[source] std::io::Error),
    #[error("Failed to spawn the benchmark executable")]
    Spawn(#[source] std::io::Error),
    #[error("Failed to wait on a benchmark child")]
    ChildIo(#[from] std::io::Error),
}

/// Owns a spawned benchmark child and guarantees it is reaped on every exit
/// path. A child that was never waited for successfully is killed on drop.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    /// Wait for exit, bounded when a timeout is given. `Ok(None)` means the
    /// child is still running after the timeout; the drop handler kills it.
    fn wait(&mut self, timeout: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
        let status = match timeout {
            Some(limit) => self.child.wait_timeout(limit)?,
            None => Some(self.child.wait()?),
        };

        if status.is_some() {
            self.reaped = true;
        }

        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            if let Err(error) = self.child.kill() {
                warn!("Failed to kill benchmark child: {error}");
            }
            if let Err(error) = self.child.wait() {
                warn!("Failed to reap benchmark child: {error}");
            }
        }
    }
}

/// Delete the persisted database state so the run starts from an empty
/// store. Absence of the file is fine.
pub fn reset_state(path: &Path) -> Result<(), RunnerError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale database state at {}", path.display());

            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(RunnerError::ResetState(error)),
    }
}

/// Run one benchmark cell: reset the persisted state, invoke the executable
/// with the collision-mode flag as its sole argument and parse the
/// elapsed-time signal from its stdout.
///
/// The exit code is deliberately not inspected. A child that exits nonzero,
/// stays silent or outlives the configured timeout degrades to `Ok(None)`.
pub fn run(
    executable: &Path,
    mode: CollisionMode,
    config: &BenchConfig,
) -> Result<Option<u64>, RunnerError> {
    reset_state(&config.database)?;

    let mut guard = Command::new(executable)
        .arg(mode.flag())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map(ChildGuard::new)
        .map_err(RunnerError::Spawn)?;

    let timeout = config.timeout.map(Duration::from_secs);
    match guard.wait(timeout)? {
        Some(status) => debug!("Benchmark child exited with {status}"),
        None => {
            warn!(
                "Benchmark child outlived the {}s timeout, killing it",
                config.timeout.unwrap_or(0)
            );

            return Ok(None);
        }
    }

    let mut stdout = String::new();
    guard
        .child
        .stdout
        .take()
        .expect_or_log("Failed to acquire stdout of benchmark child")
        .read_to_string(&mut stdout)?;

    let mut stderr = String::new();
    guard
        .child
        .stderr
        .take()
        .expect_or_log("Failed to acquire stderr of benchmark child")
        .read_to_string(&mut stderr)?;
    if !stderr.is_empty() {
        trace!("Benchmark child stderr: {stderr}");
    }

    Ok(signal::parse_elapsed(&stdout))
}
