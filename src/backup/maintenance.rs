use crate::backup::manager::BackupManager;
use crate::vault::resolve::parent_dir;
use serde::Serialize;

/// One backup file found by [`BackupManager::recovery_scan`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecoveryCandidate {
    /// Vault path of the backup copy.
    pub backup_path: String,
    /// Asset the copy was taken from, when it can be inferred from the name.
    pub original_path: Option<String>,
    /// Whether that original is currently present.
    pub original_exists: bool,
    /// Backup timestamp parsed from the path.
    pub timestamp: Option<u64>,
}

/// Outcome of [`BackupManager::restore_missing_originals`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Originals written back.
    pub restored: Vec<String>,
    /// `(original, error)` pairs that could not be written back.
    pub failed: Vec<(String, String)>,
}

/// Outcome of [`BackupManager::cleanup_backups`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Backup files deleted.
    pub deleted: usize,
    /// `(path, error)` pairs that could not be deleted.
    pub failed: Vec<(String, String)>,
}

/// `true` for paths inside the hidden backup folder or whose file name contains `.backup-`.
pub fn is_backup_path(path: &str, folder: &str) -> bool {
    let path = path.trim_start_matches('/');
    let in_folder = path
        .strip_prefix(folder)
        .is_some_and(|rest| rest.starts_with('/'));
    in_folder || path.rsplit('/').next().is_some_and(|name| name.contains(".backup-"))
}

/// Infer the original asset path and timestamp of a backup file.
pub fn original_for_backup(path: &str, folder: &str) -> Option<(String, Option<u64>)> {
    let path = path.trim_start_matches('/');
    if let Some(rest) = path.strip_prefix(folder).and_then(|r| r.strip_prefix('/')) {
        let (ts, original) = rest.split_once('/')?;
        if original.is_empty() {
            return None;
        }
        return Some((original.to_string(), ts.parse().ok()));
    }

    let dir = parent_dir(path);
    let name = path.rsplit('/').next()?;
    let (base, tail) = name.split_once(".backup-")?;
    let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
    if base.is_empty() || digits == 0 {
        return None;
    }
    let ts = tail[..digits].parse().ok();
    let ext = &tail[digits..];
    let file = format!("{base}{ext}");
    let original = if dir.is_empty() {
        file
    } else {
        format!("{dir}/{file}")
    };
    Some((original, ts))
}

impl BackupManager {
    /// Every backup file in the vault, sorted by path.
    pub fn list_backup_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .vault()
            .list_all_files()
            .into_iter()
            .filter(|p| is_backup_path(p, self.folder()))
            .collect();
        files.sort();
        files
    }

    /// Pair every backup file with its inferred original.
    pub fn recovery_scan(&self) -> Vec<RecoveryCandidate> {
        self.list_backup_files()
            .into_iter()
            .map(|backup_path| {
                let inferred = original_for_backup(&backup_path, self.folder());
                let original_exists = inferred
                    .as_ref()
                    .is_some_and(|(orig, _)| self.vault().exists(orig));
                let (original_path, timestamp) = match inferred {
                    Some((orig, ts)) => (Some(orig), ts),
                    None => (None, None),
                };
                RecoveryCandidate {
                    backup_path,
                    original_path,
                    original_exists,
                    timestamp,
                }
            })
            .collect()
    }

    /// Write back the newest backup of every original that no longer exists.
    pub fn restore_missing_originals(&self) -> RecoveryReport {
        let mut missing: Vec<RecoveryCandidate> = self
            .recovery_scan()
            .into_iter()
            .filter(|c| c.original_path.is_some() && !c.original_exists)
            .collect();
        missing.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut report = RecoveryReport::default();
        for candidate in missing {
            let Some(original) = candidate.original_path else {
                continue;
            };
            if report.restored.contains(&original) || self.vault().exists(&original) {
                continue;
            }
            match self
                .vault()
                .read(&candidate.backup_path)
                .and_then(|bytes| self.vault().write(&original, &bytes))
            {
                Ok(()) => {
                    tracing::info!(original = %original, from = %candidate.backup_path, "original recovered");
                    report.restored.push(original);
                }
                Err(e) => {
                    tracing::warn!(original = %original, error = %e, "recovery failed");
                    report.failed.push((original, e.to_string()));
                }
            }
        }
        report.failed.retain(|(orig, _)| !report.restored.contains(orig));
        report
    }

    /// Delete every backup file in the vault.
    pub fn cleanup_backups(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for path in self.list_backup_files() {
            match self.vault().delete(&path) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to delete backup");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        tracing::info!(deleted = report.deleted, failed = report.failed.len(), "backup cleanup");
        report
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backup/maintenance.rs"]
mod tests;
