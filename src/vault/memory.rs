use crate::vault::Vault;
use crate::vault::resolve::normalize_vault_path;
use std::collections::BTreeMap;
use std::io;
use std::sync::RwLock;

/// Thread-safe in-memory vault.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vault pre-populated with `(path, bytes)` pairs.
    pub fn with_files<P, B>(files: impl IntoIterator<Item = (P, B)>) -> Self
    where
        P: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let vault = Self::new();
        for (path, bytes) in files {
            // invalid paths are skipped
            let _ = vault.write(path.as_ref(), &bytes.into());
        }
        vault
    }

    fn key(path: &str) -> io::Result<String> {
        normalize_vault_path(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{path}' is not a path inside the vault"),
            )
        })
    }
}

impl Vault for MemoryVault {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let key = Self::key(path)?;
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files
            .get(&key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("'{key}' not found")))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let key = Self::key(path)?;
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(key, bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        let Ok(key) = Self::key(path) else {
            return false;
        };
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.contains_key(&key)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        let key = Self::key(path)?;
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("'{key}' not found")))
    }

    fn list_all_files(&self) -> Vec<String> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.keys().cloned().collect()
    }
}
