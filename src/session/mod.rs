//! Document-level orchestration: scan, resolve, batch, rewrite, record.

/// The [`rounder::Rounder`] session and its reports.
pub mod rounder;
