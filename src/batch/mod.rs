//! Bounded-concurrency batch of per-asset tasks.
//!
//! Each task reads its asset, backs it up, transforms it into a staging file, validates the
//! staged output and moves it to its final path. Tasks are independent; the batch returns once
//! every task has finalized.

/// Worker pool, counters and batch report.
pub mod scheduler;
/// Per-asset task and its state machine.
pub mod task;
