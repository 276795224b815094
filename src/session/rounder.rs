use crate::backup::maintenance::is_backup_path;
use crate::backup::manager::BackupManager;
use crate::batch::scheduler::BatchScheduler;
use crate::batch::task::{AssetJob, AssetOutcome, BatchContext};
use crate::foundation::config::RounderConfig;
use crate::foundation::error::RounderResult;
use crate::foundation::now_millis;
use crate::ledger::{ActionLedger, LedgerEntry, LedgerOutcome};
use crate::rewrite::document::Document;
use crate::rewrite::transaction::{
    AppliedRewrite, RewriteTarget, SkippedRewrite, build_transaction, relink,
};
use crate::scan::reference::{ImageReference, SpanKey, scan_text};
use crate::transform::gateway::TransformGateway;
use crate::transform::params::TransformParams;
use crate::vault::{AssetHandle, Vault, resolve_asset};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Which part of a document a rounding run covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// Every line.
    #[default]
    Document,
    /// Lines `start..=end` (0-based, inclusive), as for an editor selection.
    Lines {
        /// First line.
        start: usize,
        /// Last line.
        end: usize,
    },
}

impl Scope {
    /// `true` when `line` is covered.
    pub fn contains(self, line: usize) -> bool {
        match self {
            Scope::Document => true,
            Scope::Lines { start, end } => (start..=end).contains(&line),
        }
    }
}

/// A reference bound to the vault file it points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    /// The reference as scanned.
    pub reference: ImageReference,
    /// The file it resolves to.
    pub asset: AssetHandle,
}

/// References found in a document, split by how they will be handled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoundingPlan {
    /// Local references bound to an existing file.
    pub resolved: Vec<ResolvedReference>,
    /// `http(s)://` references, never processed.
    pub remote: Vec<ImageReference>,
    /// Local references with no matching file.
    pub unresolved: Vec<ImageReference>,
}

/// Result of [`Rounder::round_document`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct RoundingReport {
    /// Unique assets submitted to the batch.
    pub total: usize,
    /// Assets transformed successfully.
    pub succeeded: usize,
    /// Assets that failed.
    pub failed: usize,
    /// References rewritten in the document.
    pub edits_applied: usize,
    /// `http(s)://` references left alone.
    pub skipped_remote: Vec<ImageReference>,
    /// References whose file could not be found.
    pub unresolved: Vec<ImageReference>,
    /// References left alone because another file claimed the same output path.
    pub conflicts: Vec<ImageReference>,
    /// References whose rewrite was dropped at fan-in.
    pub skipped_rewrites: Vec<SkippedRewrite>,
    /// Error from the document transaction, if it was rejected.
    pub rewrite_error: Option<String>,
    /// Per-asset outcomes, in submission order.
    pub outcomes: Vec<AssetOutcome>,
}

/// Rounding session over one vault.
///
/// Owns the transform gateway, the backup manager, the worker pool and the single pending-action
/// ledger slot.
pub struct Rounder {
    vault: Arc<dyn Vault>,
    config: RounderConfig,
    gateway: TransformGateway,
    backups: BackupManager,
    scheduler: BatchScheduler,
    ledger: ActionLedger,
}

impl Rounder {
    /// Build a session from a validated `config`.
    pub fn new(vault: Arc<dyn Vault>, config: RounderConfig) -> RounderResult<Self> {
        config.validate()?;
        let gateway = TransformGateway::from_config(&config);
        let backups = BackupManager::new(vault.clone(), config.backup_folder.clone());
        let scheduler = BatchScheduler::new(config.concurrency)?;
        Ok(Self {
            vault,
            config,
            gateway,
            backups,
            scheduler,
            ledger: ActionLedger::new(),
        })
    }

    /// Replace the transform gateway.
    pub fn with_gateway(mut self, gateway: TransformGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// The vault this session works on.
    pub fn vault(&self) -> &Arc<dyn Vault> {
        &self.vault
    }

    /// Session configuration.
    pub fn config(&self) -> &RounderConfig {
        &self.config
    }

    /// Backup manager, also used for maintenance.
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// The pending-action slot.
    pub fn ledger(&self) -> &ActionLedger {
        &self.ledger
    }

    /// Scan `text` within `scope` and resolve every reference against the vault.
    ///
    /// References sharing a span are kept once. Files inside the backup material are never
    /// treated as resolved.
    pub fn plan(&self, text: &str, document_path: &str, scope: Scope) -> RoundingPlan {
        let mut seen: HashSet<SpanKey> = HashSet::new();
        let mut plan = RoundingPlan::default();
        for reference in scan_text(text) {
            if !scope.contains(reference.line_index) || !seen.insert(reference.span()) {
                continue;
            }
            if reference.is_remote() {
                plan.remote.push(reference);
                continue;
            }
            let resolved = resolve_asset(self.vault.as_ref(), &reference.asset_path, document_path)
                .filter(|asset| !is_backup_path(&asset.path, self.backups.folder()));
            match resolved {
                Some(asset) => plan.resolved.push(ResolvedReference { reference, asset }),
                None => {
                    tracing::debug!(path = %reference.asset_path, "reference not resolved");
                    plan.unresolved.push(reference);
                }
            }
        }
        plan
    }

    /// Round every image referenced from `doc` and point the references at the results.
    ///
    /// Each distinct file is transformed once. Failed assets leave their references untouched.
    /// When at least one asset succeeds the batch replaces the pending ledger entry.
    pub fn round_document(
        &mut self,
        doc: &mut dyn Document,
        document_path: &str,
        params: &TransformParams,
        scope: Scope,
    ) -> RounderResult<RoundingReport> {
        params.validate()?;
        let text = doc.get_text()?;
        let plan = self.plan(&text, document_path, scope);
        let mut report = RoundingReport {
            skipped_remote: plan.remote,
            unresolved: plan.unresolved,
            ..RoundingReport::default()
        };

        let mut jobs: Vec<AssetJob> = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut claimed_outputs: HashMap<String, String> = HashMap::new();
        let mut members: Vec<ResolvedReference> = Vec::new();
        for item in plan.resolved {
            let source = item.asset.path.clone();
            if !queued.contains(&source) {
                let output_path = params.output_path(&source);
                if let Some(owner) = claimed_outputs.get(&output_path) {
                    tracing::warn!(
                        path = %source,
                        output = %output_path,
                        owner = %owner,
                        "output path already claimed by another asset"
                    );
                    report.conflicts.push(item.reference);
                    continue;
                }
                claimed_outputs.insert(output_path.clone(), source.clone());
                queued.insert(source.clone());
                jobs.push(AssetJob {
                    asset: item.asset.clone(),
                    output_path,
                });
            }
            members.push(item);
        }

        if jobs.is_empty() {
            tracing::info!(document = %document_path, "no local images to round");
            return Ok(report);
        }

        let ctx = BatchContext {
            vault: self.vault.as_ref(),
            backups: &self.backups,
            gateway: &self.gateway,
            params,
        };
        let batch = self.scheduler.run(&jobs, &ctx);
        report.total = batch.total;
        report.succeeded = batch.succeeded;
        report.failed = batch.failed;

        let new_paths: HashMap<&str, &str> = batch
            .successes()
            .filter_map(|o| Some((o.job.asset.path.as_str(), o.new_path()?)))
            .collect();
        let targets: Vec<RewriteTarget> = members
            .iter()
            .filter_map(|m| {
                let new_path = new_paths.get(m.asset.path.as_str())?;
                Some(RewriteTarget {
                    reference: m.reference.clone(),
                    new_link: relink(&m.reference.asset_path, new_path),
                })
            })
            .collect();

        let rewrites = if targets.is_empty() {
            Vec::new()
        } else {
            match apply_rewrites(doc, &targets) {
                Ok((applied, skipped)) => {
                    report.edits_applied = applied.len();
                    report.skipped_rewrites = skipped;
                    applied
                }
                Err(e) => {
                    tracing::warn!(document = %document_path, error = %e, "reference rewrite failed");
                    report.rewrite_error = Some(e.to_string());
                    Vec::new()
                }
            }
        };

        let successes: Vec<&AssetOutcome> = batch.successes().collect();
        let entry = LedgerEntry {
            original_paths: successes.iter().map(|o| o.job.asset.path.clone()).collect(),
            backup_records: successes.iter().filter_map(|o| o.backup.clone()).collect(),
            new_paths: successes
                .iter()
                .filter_map(|o| o.new_path().map(str::to_string))
                .collect(),
            document_id: document_path.to_string(),
            timestamp: now_millis(),
            rewrites,
            displaced_records: successes
                .iter()
                .filter_map(|o| o.displaced.clone())
                .collect(),
        };
        self.ledger.record(entry);

        tracing::info!(
            document = %document_path,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            edits = report.edits_applied,
            "document rounded"
        );
        report.outcomes = batch.outcomes;
        Ok(report)
    }

    /// Undo the pending batch, reverting references in `doc` when given.
    pub fn undo(&mut self, doc: Option<&mut dyn Document>) -> LedgerOutcome {
        self.ledger.undo(&self.backups, doc)
    }

    /// Keep the pending batch and discard its backups.
    pub fn confirm(&mut self) -> LedgerOutcome {
        self.ledger.confirm(&self.backups)
    }

    /// Replace the in-memory ledger with the one persisted in the vault.
    pub fn load_ledger(&mut self) -> RounderResult<()> {
        self.ledger = ActionLedger::load(self.vault.as_ref(), &self.config.ledger_file)?;
        Ok(())
    }

    /// Persist the ledger in the vault.
    pub fn save_ledger(&self) -> RounderResult<()> {
        self.ledger
            .save(self.vault.as_ref(), &self.config.ledger_file)
    }
}

impl std::fmt::Debug for Rounder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rounder")
            .field("config", &self.config)
            .field("gateway", &self.gateway)
            .field("scheduler", &self.scheduler)
            .field("pending", &self.ledger.has_pending())
            .finish_non_exhaustive()
    }
}

fn apply_rewrites(
    doc: &mut dyn Document,
    targets: &[RewriteTarget],
) -> RounderResult<(Vec<AppliedRewrite>, Vec<SkippedRewrite>)> {
    let live = doc.get_text()?;
    let tx = build_transaction(&live, targets);
    if !tx.is_empty() {
        doc.apply_atomic_edits(&tx.edits)?;
    }
    Ok((tx.rewrites, tx.skipped))
}

#[cfg(test)]
#[path = "../../tests/unit/session/rounder.rs"]
mod tests;
