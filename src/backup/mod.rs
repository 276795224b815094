//! Redundant point-in-time asset backups.
//!
//! Every backup is written twice: once under a hidden top-level folder namespaced by timestamp,
//! once next to the original as `{base}.backup-{ts}{ext}`. Either copy is enough to restore.

/// Vault-wide recovery scan and cleanup utilities.
pub mod maintenance;
/// Backup creation, restore and discard.
pub mod manager;
