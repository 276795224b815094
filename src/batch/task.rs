use crate::backup::manager::{BackupManager, BackupRecord};
use crate::batch::scheduler::BatchCounters;
use crate::foundation::error::{FailureKind, RounderError, RounderResult};
use crate::transform::gateway::TransformGateway;
use crate::transform::params::TransformParams;
use crate::vault::{AssetHandle, Vault};
use serde::Serialize;
use std::io;

/// Lifecycle of one asset task. States only move forward; `Finalized` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TaskState {
    /// Queued, waiting for a pool slot.
    Pending,
    /// Reading the source asset.
    Reading,
    /// Writing backup copies.
    BackingUp,
    /// Running the transform gateway and staging its output.
    Transforming,
    /// Checking the staged output.
    Validating,
    /// Done, with a success or failure outcome.
    Finalized,
}

impl TaskState {
    /// `true` when `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        next > self
    }
}

/// One unit of batch work: an asset and the path its rounded copy is written to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetJob {
    /// Source asset.
    pub asset: AssetHandle,
    /// Final deterministic output path.
    pub output_path: String,
}

/// Why an asset task failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Underlying message.
    pub message: String,
}

impl From<&RounderError> for AssetFailure {
    fn from(err: &RounderError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Terminal result of one asset task.
#[derive(Clone, Debug, Serialize)]
pub struct AssetOutcome {
    /// The job this outcome belongs to.
    pub job: AssetJob,
    /// New asset path on success.
    pub result: Result<String, AssetFailure>,
    /// Backups kept for a successful task (discarded on failure).
    pub backup: Option<BackupRecord>,
    /// Backup of a file that already sat at the output path and was replaced.
    pub displaced: Option<BackupRecord>,
    /// Strategy that produced the output.
    pub strategy: Option<&'static str>,
    /// The fallback produced the output after the primary failed.
    pub degraded: bool,
}

impl AssetOutcome {
    /// `true` for a successful task.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// New asset path, if the task succeeded.
    pub fn new_path(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Everything a task needs besides its job.
#[derive(Clone, Copy)]
pub struct BatchContext<'a> {
    /// Content store.
    pub vault: &'a dyn Vault,
    /// Backup creation and discard.
    pub backups: &'a BackupManager,
    /// Transform with fallback.
    pub gateway: &'a TransformGateway,
    /// Parameters shared by every task of the batch.
    pub params: &'a TransformParams,
}

struct Progress<'a> {
    path: &'a str,
    state: TaskState,
}

impl Progress<'_> {
    fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal task transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(path = %self.path, from = ?self.state, to = ?next, "task state");
        self.state = next;
    }
}

/// Staging location for an output before it is moved into place.
pub fn staging_path(output_path: &str) -> String {
    format!("{output_path}.partial")
}

/// Run one asset task to a terminal state. Never panics on asset errors and never propagates
/// them; every failure becomes part of the outcome.
pub fn run_task(ctx: &BatchContext<'_>, job: &AssetJob, counters: &BatchCounters) -> AssetOutcome {
    let mut progress = Progress {
        path: &job.asset.path,
        state: TaskState::Pending,
    };
    let mut outcome = AssetOutcome {
        job: job.clone(),
        result: Err(AssetFailure {
            kind: FailureKind::Other,
            message: "task did not run".to_string(),
        }),
        backup: None,
        displaced: None,
        strategy: None,
        degraded: false,
    };

    let result = process(ctx, job, &mut progress, &mut outcome);
    progress.advance(TaskState::Finalized);

    match result {
        Ok(new_path) => {
            tracing::info!(path = %job.asset.path, new_path = %new_path, "asset rounded");
            outcome.result = Ok(new_path);
            counters.record(true);
        }
        Err(err) => {
            tracing::warn!(
                path = %job.asset.path,
                kind = ?err.kind(),
                error = %err,
                "asset failed"
            );
            for record in [outcome.backup.take(), outcome.displaced.take()]
                .into_iter()
                .flatten()
            {
                ctx.backups.discard(&record);
            }
            outcome.result = Err(AssetFailure::from(&err));
            counters.record(false);
        }
    }
    outcome
}

fn process(
    ctx: &BatchContext<'_>,
    job: &AssetJob,
    progress: &mut Progress<'_>,
    outcome: &mut AssetOutcome,
) -> RounderResult<String> {
    let source = &job.asset.path;

    progress.advance(TaskState::Reading);
    let bytes = ctx.vault.read(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RounderError::file_not_found(source.clone()),
        _ => RounderError::read_failed(format!("'{source}': {e}")),
    })?;
    if bytes.is_empty() {
        return Err(RounderError::read_failed(format!("'{source}' is empty")));
    }

    progress.advance(TaskState::BackingUp);
    outcome.backup = Some(ctx.backups.backup_bytes(&job.asset, &bytes)?);

    progress.advance(TaskState::Transforming);
    let output = ctx.gateway.apply(&bytes, ctx.params)?;
    outcome.strategy = Some(output.strategy);
    outcome.degraded = output.degraded;
    let staging = staging_path(&job.output_path);
    ctx.vault
        .write(&staging, &output.bytes)
        .map_err(|e| RounderError::write_failed(format!("stage '{staging}': {e}")))?;

    progress.advance(TaskState::Validating);
    let staged = match ctx.vault.read(&staging) {
        Ok(staged) if !staged.is_empty() => staged,
        Ok(_) => {
            remove_quietly(ctx.vault, &staging);
            return Err(RounderError::output_invalid(format!(
                "staged output '{staging}' is empty"
            )));
        }
        Err(e) => {
            remove_quietly(ctx.vault, &staging);
            return Err(RounderError::output_invalid(format!(
                "staged output '{staging}' is missing: {e}"
            )));
        }
    };

    if ctx.vault.exists(&job.output_path) {
        let displaced = ctx
            .backups
            .backup(&AssetHandle::new(job.output_path.clone()));
        match displaced {
            Ok(record) => outcome.displaced = Some(record),
            Err(e) => {
                remove_quietly(ctx.vault, &staging);
                return Err(e);
            }
        }
        tracing::debug!(path = %job.output_path, "existing output backed up");
    }

    let moved = ctx
        .vault
        .write(&job.output_path, &staged)
        .map_err(|e| RounderError::write_failed(format!("'{}': {e}", job.output_path)));
    remove_quietly(ctx.vault, &staging);
    if moved.is_err()
        && let Some(record) = &outcome.displaced
        && let Err(e) = ctx.backups.restore(record, &job.output_path)
    {
        // keep the copies for `backups recover`
        tracing::warn!(path = %job.output_path, error = %e, "could not put back replaced output");
        outcome.displaced = None;
    }
    moved?;

    Ok(job.output_path.clone())
}

fn remove_quietly(vault: &dyn Vault, path: &str) {
    if let Err(e) = vault.delete(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(path, error = %e, "failed to remove staging file");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/task.rs"]
mod tests;
