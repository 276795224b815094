use crate::foundation::error::{RounderError, RounderResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Default number of asset tasks that may run at once.
pub const DEFAULT_CONCURRENCY: usize = 3;
/// Default hidden folder (at the vault root) holding timestamped backups.
pub const DEFAULT_BACKUP_FOLDER: &str = ".image-rounding-backups";
/// Default vault path of the persisted action ledger.
pub const DEFAULT_LEDGER_FILE: &str = ".image-rounding-ledger.json";

/// External transform program invocation.
///
/// The program is run as `program [args..] <src> <dst> <radius> <unit> [effects..]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    /// Executable name or path.
    pub program: String,
    /// Leading arguments, e.g. the script path for an interpreter.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runtime configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RounderConfig {
    /// Worker pool size for a batch.
    pub concurrency: usize,
    /// Timeout applied to each external transform invocation.
    pub transform_timeout_secs: u64,
    /// Name of the hidden backup folder at the vault root.
    pub backup_folder: String,
    /// Vault path of the persisted ledger file.
    pub ledger_file: String,
    /// Primary transform program. `None` runs the in-process rasterizer only.
    pub external: Option<ExternalCommand>,
}

impl Default for RounderConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            transform_timeout_secs: 30,
            backup_folder: DEFAULT_BACKUP_FOLDER.to_string(),
            ledger_file: DEFAULT_LEDGER_FILE.to_string(),
            external: None,
        }
    }
}

impl RounderConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> RounderResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| RounderError::validation(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> RounderResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RounderError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges.
    pub fn validate(&self) -> RounderResult<()> {
        if self.concurrency == 0 {
            return Err(RounderError::validation("concurrency must be >= 1"));
        }
        if self.transform_timeout_secs == 0 {
            return Err(RounderError::validation(
                "transform_timeout_secs must be > 0",
            ));
        }
        let folder = self.backup_folder.trim();
        if folder.is_empty() || folder.contains('/') || folder.contains('\\') || folder == ".." {
            return Err(RounderError::validation(
                "backup_folder must be a single non-empty path segment",
            ));
        }
        if self.ledger_file.trim().is_empty() {
            return Err(RounderError::validation("ledger_file must be non-empty"));
        }
        if let Some(ext) = &self.external
            && ext.program.trim().is_empty()
        {
            return Err(RounderError::validation(
                "external.program must be non-empty",
            ));
        }
        Ok(())
    }

    /// External transform timeout as a [`Duration`].
    pub fn transform_timeout(&self) -> Duration {
        Duration::from_secs(self.transform_timeout_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
