use crate::batch::task::{AssetJob, AssetOutcome, BatchContext, run_task};
use crate::foundation::error::{RounderError, RounderResult};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Aggregate counters updated by workers as tasks finalize.
#[derive(Debug, Default)]
pub struct BatchCounters {
    done: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of [`BatchCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Tasks that reached `Finalized`.
    pub done: usize,
    /// Successful tasks.
    pub succeeded: usize,
    /// Failed tasks.
    pub failed: usize,
}

impl BatchCounters {
    pub(crate) fn record(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.done.fetch_add(1, Ordering::AcqRel);
    }

    /// Read the current totals.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            done: self.done.load(Ordering::Acquire),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Per-asset outcomes of one batch, in job order, plus totals.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    /// One outcome per job.
    pub outcomes: Vec<AssetOutcome>,
    /// Number of jobs.
    pub total: usize,
    /// Successful jobs.
    pub succeeded: usize,
    /// Failed jobs.
    pub failed: usize,
}

impl BatchReport {
    /// Successful outcomes.
    pub fn successes(&self) -> impl Iterator<Item = &AssetOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }
}

/// Bounded worker pool running asset tasks.
///
/// At most `concurrency` tasks run at once; every task runs to a terminal state and a failure in
/// one task never affects the others.
pub struct BatchScheduler {
    pool: rayon::ThreadPool,
    concurrency: usize,
}

impl BatchScheduler {
    /// Build a scheduler with `concurrency` workers.
    pub fn new(concurrency: usize) -> RounderResult<Self> {
        Ok(Self {
            pool: build_thread_pool(concurrency)?,
            concurrency,
        })
    }

    /// Worker count.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every job and wait for all of them to finalize.
    pub fn run(&self, jobs: &[AssetJob], ctx: &BatchContext<'_>) -> BatchReport {
        let counters = BatchCounters::default();
        tracing::info!(
            jobs = jobs.len(),
            concurrency = self.concurrency,
            params = %ctx.params,
            "batch started"
        );

        let outcomes: Vec<AssetOutcome> = self.pool.install(|| {
            jobs.par_iter()
                .with_max_len(1)
                .map(|job| run_task(ctx, job, &counters))
                .collect()
        });

        let totals = counters.snapshot();
        debug_assert_eq!(totals.done, jobs.len());
        tracing::info!(
            total = jobs.len(),
            succeeded = totals.succeeded,
            failed = totals.failed,
            "batch finished"
        );
        BatchReport {
            outcomes,
            total: jobs.len(),
            succeeded: totals.succeeded,
            failed: totals.failed,
        }
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn build_thread_pool(threads: usize) -> RounderResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(RounderError::validation("batch concurrency must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("embed-rounder-{i}"))
        .build()
        .map_err(|e| {
            RounderError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
        })
}

#[cfg(test)]
#[path = "../../tests/unit/batch/scheduler.rs"]
mod tests;
