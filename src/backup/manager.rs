use crate::foundation::error::{RounderError, RounderResult};
use crate::foundation::now_millis;
use crate::vault::resolve::parent_dir;
use crate::vault::{AssetHandle, Vault};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;

/// Where the pre-transform copies of one asset were stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Vault path of the backed-up asset.
    pub original_path: String,
    /// Copy under the hidden backup folder.
    pub backup_path_primary: Option<String>,
    /// Copy next to the original (`{base}.backup-{ts}{ext}`).
    pub backup_path_secondary: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl BackupRecord {
    /// A record is usable when at least one copy was written.
    pub fn is_valid(&self) -> bool {
        self.backup_path_primary.is_some() || self.backup_path_secondary.is_some()
    }

    /// Existing copy paths, hidden-folder copy first.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.backup_path_primary
            .as_deref()
            .into_iter()
            .chain(self.backup_path_secondary.as_deref())
    }
}

/// Creates, restores and discards redundant asset backups.
#[derive(Clone)]
pub struct BackupManager {
    vault: Arc<dyn Vault>,
    folder: String,
}

impl BackupManager {
    /// Manage backups in `vault`, with hidden copies under the top-level `folder`.
    pub fn new(vault: Arc<dyn Vault>, folder: impl Into<String>) -> Self {
        Self {
            vault,
            folder: folder.into(),
        }
    }

    /// Name of the hidden backup folder.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub(crate) fn vault(&self) -> &dyn Vault {
        self.vault.as_ref()
    }

    /// Read the asset and back it up.
    pub fn backup(&self, asset: &AssetHandle) -> RounderResult<BackupRecord> {
        let bytes = self.vault.read(&asset.path).map_err(|e| {
            RounderError::backup_failed(format!("cannot read '{}' for backup: {e}", asset.path))
        })?;
        self.backup_bytes(asset, &bytes)
    }

    /// Write both backup copies of `bytes` for `asset`.
    ///
    /// Succeeds when at least one copy was written.
    pub fn backup_bytes(&self, asset: &AssetHandle, bytes: &[u8]) -> RounderResult<BackupRecord> {
        let mut ts = now_millis();
        while self.vault.exists(&self.hidden_path(&asset.path, ts))
            || self.vault.exists(&local_backup_path(&asset.path, ts))
        {
            ts += 1;
        }

        let hidden = self.hidden_path(&asset.path, ts);
        let local = local_backup_path(&asset.path, ts);

        let primary = self.write_copy(&hidden, bytes);
        let secondary = self.write_copy(&local, bytes);

        match (primary, secondary) {
            (Err(e1), Err(e2)) => Err(RounderError::backup_failed(format!(
                "'{}': hidden copy: {e1}; local copy: {e2}",
                asset.path
            ))),
            (primary, secondary) => {
                let record = BackupRecord {
                    original_path: asset.path.clone(),
                    backup_path_primary: primary.ok(),
                    backup_path_secondary: secondary.ok(),
                    created_at: ts,
                };
                tracing::debug!(
                    path = %asset.path,
                    primary = ?record.backup_path_primary,
                    secondary = ?record.backup_path_secondary,
                    "backup created"
                );
                Ok(record)
            }
        }
    }

    fn write_copy(&self, path: &str, bytes: &[u8]) -> io::Result<String> {
        match self.vault.write(path, bytes) {
            Ok(()) => Ok(path.to_string()),
            Err(e) => {
                tracing::warn!(path, error = %e, "backup copy failed");
                Err(e)
            }
        }
    }

    /// Hidden-folder location for a backup of `original` taken at `ts`.
    pub fn hidden_path(&self, original: &str, ts: u64) -> String {
        format!("{}/{ts}/{original}", self.folder)
    }

    /// Write the backed-up bytes to `target`, trying the hidden copy first.
    pub fn restore(&self, record: &BackupRecord, target: &str) -> RounderResult<()> {
        let mut errors = Vec::new();
        for path in record.paths() {
            match self
                .vault
                .read(path)
                .and_then(|bytes| self.vault.write(target, &bytes))
            {
                Ok(()) => {
                    tracing::debug!(from = path, to = target, "restored backup");
                    return Ok(());
                }
                Err(e) => errors.push(format!("{path}: {e}")),
            }
        }
        if errors.is_empty() {
            errors.push("record holds no backup copies".to_string());
        }
        Err(RounderError::restore_failed(format!(
            "'{target}': {}",
            errors.join("; ")
        )))
    }

    /// Delete both copies, tolerating either being gone already.
    pub fn discard(&self, record: &BackupRecord) {
        for path in record.paths() {
            match self.vault.delete(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path, error = %e, "failed to delete backup copy"),
            }
        }
    }
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

/// Sibling backup location: `{dir}/{base}.backup-{ts}{ext}`.
pub fn local_backup_path(original: &str, ts: u64) -> String {
    let dir = parent_dir(original);
    let file = original.rsplit('/').next().unwrap_or(original);
    let (base, ext) = match file.rfind('.') {
        Some(i) if i > 0 => (&file[..i], &file[i..]),
        _ => (file, ""),
    };
    let name = format!("{base}.backup-{ts}{ext}");
    if dir.is_empty() {
        name
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backup/manager.rs"]
mod tests;
