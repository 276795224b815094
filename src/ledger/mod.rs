//! Single-slot record of the most recent batch, enabling one undo or confirm.
//!
//! Only the latest successful batch is remembered. Recording a new batch replaces an unconsumed
//! entry without restoring it.

use crate::backup::manager::{BackupManager, BackupRecord};
use crate::foundation::error::RounderResult;
use crate::rewrite::document::Document;
use crate::rewrite::transaction::{AppliedRewrite, build_revert_transaction};
use crate::vault::Vault;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::io;

/// What a completed batch changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Assets that were transformed.
    pub original_paths: Vec<String>,
    /// Backups of those assets.
    pub backup_records: Vec<BackupRecord>,
    /// Transformed assets written by the batch.
    pub new_paths: Vec<String>,
    /// Vault path of the document whose references were rewritten.
    pub document_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Reference rewrites applied to the document.
    #[serde(default)]
    pub rewrites: Vec<AppliedRewrite>,
    /// Backups of files that already existed at a new path and were overwritten.
    #[serde(default)]
    pub displaced_records: Vec<BackupRecord>,
}

/// Counts reported by [`ActionLedger::undo`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UndoReport {
    /// Originals restored from backup.
    pub restored: usize,
    /// `(original, error)` pairs that could not be restored. Their backups are kept.
    pub restore_failed: Vec<(String, String)>,
    /// Transformed assets deleted.
    pub deleted: usize,
    /// New paths whose overwritten file was put back instead of being deleted.
    pub replaced_restored: usize,
    /// `(path, error)` pairs that could not be deleted.
    pub delete_failed: Vec<(String, String)>,
    /// Document references pointed back at the originals.
    pub references_reverted: usize,
    /// Error from the document revert, if it was rejected.
    pub document_error: Option<String>,
}

/// Counts reported by [`ActionLedger::confirm`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmReport {
    /// Backup records discarded.
    pub backups_discarded: usize,
}

/// Result of an undo or confirm request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LedgerOutcome {
    /// No entry was held.
    NothingToDo,
    /// The entry was undone.
    Undone(UndoReport),
    /// The entry was confirmed.
    Confirmed(ConfirmReport),
}

/// Owner of the single pending-action slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionLedger {
    entry: Option<LedgerEntry>,
}

impl ActionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending entry, if any.
    pub fn entry(&self) -> Option<&LedgerEntry> {
        self.entry.as_ref()
    }

    /// `true` when an undo or confirm would do something.
    pub fn has_pending(&self) -> bool {
        self.entry.is_some()
    }

    /// Store `entry` if it wrote at least one new asset. Returns whether it was stored.
    pub fn record(&mut self, entry: LedgerEntry) -> bool {
        if entry.new_paths.is_empty() {
            return false;
        }
        if let Some(previous) = self.entry.replace(entry) {
            tracing::info!(
                document = %previous.document_id,
                assets = previous.new_paths.len(),
                "replacing unconsumed ledger entry"
            );
        }
        true
    }

    /// Restore every original, delete every new asset or put back the file it replaced, revert
    /// `document` references when given, and clear the entry.
    pub fn undo(
        &mut self,
        backups: &BackupManager,
        document: Option<&mut dyn Document>,
    ) -> LedgerOutcome {
        let Some(entry) = self.entry.take() else {
            return LedgerOutcome::NothingToDo;
        };
        let vault = backups.vault();
        let mut report = UndoReport::default();

        for record in &entry.backup_records {
            match backups.restore(record, &record.original_path) {
                Ok(()) => {
                    report.restored += 1;
                    backups.discard(record);
                }
                Err(e) => {
                    tracing::warn!(path = %record.original_path, error = %e, "undo restore failed");
                    report
                        .restore_failed
                        .push((record.original_path.clone(), e.to_string()));
                }
            }
        }

        for path in &entry.new_paths {
            if entry.original_paths.contains(path) {
                continue;
            }
            if let Some(record) = entry
                .displaced_records
                .iter()
                .find(|r| &r.original_path == path)
            {
                match backups.restore(record, path) {
                    Ok(()) => {
                        report.replaced_restored += 1;
                        backups.discard(record);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "undo could not put back replaced file");
                        report.restore_failed.push((path.clone(), e.to_string()));
                    }
                }
                continue;
            }
            match vault.delete(path) {
                Ok(()) => report.deleted += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "undo delete failed");
                    report.delete_failed.push((path.clone(), e.to_string()));
                }
            }
        }

        if let Some(doc) = document
            && !entry.rewrites.is_empty()
        {
            let reverted = doc.get_text().and_then(|text| {
                let tx = build_revert_transaction(&text, &entry.rewrites);
                doc.apply_atomic_edits(&tx.edits)?;
                Ok(tx.edits.len())
            });
            match reverted {
                Ok(n) => report.references_reverted = n,
                Err(e) => {
                    tracing::warn!(document = %entry.document_id, error = %e, "reference revert failed");
                    report.document_error = Some(e.to_string());
                }
            }
        }

        tracing::info!(
            restored = report.restored,
            failed = report.restore_failed.len(),
            deleted = report.deleted,
            replaced = report.replaced_restored,
            references = report.references_reverted,
            "undo finished"
        );
        LedgerOutcome::Undone(report)
    }

    /// Discard every backup of the pending entry and clear it, leaving assets untouched.
    pub fn confirm(&mut self, backups: &BackupManager) -> LedgerOutcome {
        let Some(entry) = self.entry.take() else {
            return LedgerOutcome::NothingToDo;
        };
        let records: Vec<&BackupRecord> = entry
            .backup_records
            .iter()
            .chain(&entry.displaced_records)
            .collect();
        for record in &records {
            backups.discard(record);
        }
        tracing::info!(backups = records.len(), "batch confirmed");
        LedgerOutcome::Confirmed(ConfirmReport {
            backups_discarded: records.len(),
        })
    }

    /// Load the ledger persisted at `path`; a missing file is an empty ledger.
    pub fn load(vault: &dyn Vault, path: &str) -> RounderResult<Self> {
        if !vault.exists(path) {
            return Ok(Self::new());
        }
        let bytes = vault
            .read(path)
            .with_context(|| format!("read ledger '{path}'"))?;
        let entry: Option<LedgerEntry> =
            serde_json::from_slice(&bytes).with_context(|| format!("parse ledger '{path}'"))?;
        Ok(Self { entry })
    }

    /// Persist the ledger at `path`; an empty ledger removes the file.
    pub fn save(&self, vault: &dyn Vault, path: &str) -> RounderResult<()> {
        match &self.entry {
            Some(entry) => {
                let json = serde_json::to_vec_pretty(&Some(entry))
                    .context("serialize ledger entry")?;
                vault
                    .write(path, &json)
                    .with_context(|| format!("write ledger '{path}'"))?;
            }
            None => match vault.delete(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("remove ledger '{path}'"))
                        .into());
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ledger/ledger.rs"]
mod tests;
