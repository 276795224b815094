//! Virtual filesystem boundary.
//!
//! The core only needs six operations from the storage backend. Paths are vault-relative and use
//! `/` separators.

use std::io;

/// Directory-backed vault.
pub mod disk;
/// In-memory vault.
pub mod memory;
/// Link resolution and path comparison.
pub mod resolve;

pub use resolve::resolve_asset;

/// Storage backend consumed by the rounding pipeline.
///
/// Implementations must be shareable across worker threads.
pub trait Vault: Send + Sync {
    /// Read a whole file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Create or overwrite a file, creating parent folders as needed.
    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()>;

    /// Return `true` if a file exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Delete a file.
    fn delete(&self, path: &str) -> io::Result<()>;

    /// Every file path in the vault, sorted.
    fn list_all_files(&self) -> Vec<String>;

    /// Resolve link text as written in `from_path` to the nearest matching file.
    ///
    /// The default implementation indexes [`Vault::list_all_files`]: file names match
    /// case-insensitively, the extension is optional, and the candidate closest to the referring
    /// document wins.
    fn resolve_link_path(&self, raw_link: &str, from_path: &str) -> Option<String> {
        resolve::nearest_link_match(&self.list_all_files(), raw_link, from_path)
    }
}

/// A reference path bound to a concrete file in the vault.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct AssetHandle {
    /// Normalized vault path of the file.
    pub path: String,
}

impl AssetHandle {
    /// Wrap a normalized vault path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl std::fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}
