//! embed-rounder rounds the corners of images embedded in Markdown notes.
//!
//! A run scans a document for image references in three syntaxes, resolves them against a
//! [`Vault`], transforms each distinct asset on a bounded worker pool, and then rewrites every
//! successful reference in one atomic edit transaction. Originals are backed up twice before any
//! transform, and the most recent batch can be undone or confirmed exactly once.
//!
//! The entry point is [`Rounder`]:
//!
//! - Build it over a vault with a [`RounderConfig`]
//! - Call [`Rounder::round_document`] with resolved [`TransformParams`]
//! - Follow up with [`Rounder::undo`] or [`Rounder::confirm`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Redundant backups and backup-folder maintenance.
pub mod backup;
/// Bounded-concurrency asset batches.
pub mod batch;
/// The single pending-action ledger.
pub mod ledger;
/// Atomic reference rewriting.
pub mod rewrite;
/// Image reference scanning and path sanitizing.
pub mod scan;
/// Document-level orchestration.
pub mod session;
/// Pixel transform strategies and parameters.
pub mod transform;
/// Virtual filesystem boundary and path resolution.
pub mod vault;

pub use crate::foundation::config::{
    DEFAULT_BACKUP_FOLDER, DEFAULT_CONCURRENCY, DEFAULT_LEDGER_FILE, ExternalCommand,
    RounderConfig,
};
pub use crate::foundation::error::{FailureKind, RounderError, RounderResult};

pub use crate::backup::maintenance::{CleanupReport, RecoveryCandidate, RecoveryReport};
pub use crate::backup::manager::{BackupManager, BackupRecord};
pub use crate::batch::scheduler::{BatchReport, BatchScheduler};
pub use crate::batch::task::{AssetFailure, AssetJob, AssetOutcome, TaskState};
pub use crate::ledger::{ActionLedger, ConfirmReport, LedgerEntry, LedgerOutcome, UndoReport};
pub use crate::rewrite::document::{Document, FileDocument, TextDocument, TextEdit};
pub use crate::scan::reference::{ImageReference, SyntaxKind, scan_line, scan_text};
pub use crate::session::rounder::{
    ResolvedReference, Rounder, RoundingPlan, RoundingReport, Scope,
};
pub use crate::transform::color::Color;
pub use crate::transform::external::ExternalStrategy;
pub use crate::transform::gateway::{TransformGateway, TransformStrategy};
pub use crate::transform::params::{
    BorderSpec, BorderStyle, RadiusUnit, ShadowSpec, TransformParams,
};
pub use crate::transform::raster::RasterStrategy;
pub use crate::vault::disk::DiskVault;
pub use crate::vault::memory::MemoryVault;
pub use crate::vault::{AssetHandle, Vault, resolve_asset};
