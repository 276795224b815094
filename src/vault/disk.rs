use crate::vault::Vault;
use crate::vault::resolve::normalize_vault_path;
use std::io;
use std::path::{Path, PathBuf};

/// A vault rooted at a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct DiskVault {
    root: PathBuf,
}

impl DiskVault {
    /// Create a vault rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault path to a filesystem path, refusing paths that escape the root.
    pub fn full_path(&self, path: &str) -> io::Result<PathBuf> {
        let rel = normalize_vault_path(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{path}' is not a path inside the vault"),
            )
        })?;
        Ok(rel.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }
}

impl Vault for DiskVault {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.full_path(path)?)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, bytes)
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        std::fs::remove_file(self.full_path(path)?)
    }

    fn list_all_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
        out.sort();
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vault/disk.rs"]
mod tests;
