use super::*;
use crate::vault::Vault;
use crate::vault::memory::MemoryVault;
use std::sync::Arc;

const FOLDER: &str = ".image-rounding-backups";

fn seeded() -> (Arc<MemoryVault>, BackupManager) {
    let vault = Arc::new(MemoryVault::with_files([
        ("pics/cat.png", b"rounded".to_vec()),
        ("pics/cat.backup-100.png", b"old cat".to_vec()),
        (".image-rounding-backups/100/pics/cat.png", b"old cat".to_vec()),
        (".image-rounding-backups/200/notes/dog.jpg", b"dog v2".to_vec()),
        (".image-rounding-backups/150/notes/dog.jpg", b"dog v1".to_vec()),
        ("notes/today.md", b"# today".to_vec()),
    ]));
    let mgr = BackupManager::new(vault.clone(), FOLDER);
    (vault, mgr)
}

#[test]
fn recognizes_backup_paths() {
    assert!(is_backup_path(".image-rounding-backups/1/a.png", FOLDER));
    assert!(is_backup_path("x/a.backup-12.png", FOLDER));
    assert!(!is_backup_path(".image-rounding-backups-old/a.png", FOLDER));
    assert!(!is_backup_path("pics/cat-rounded-25p.png", FOLDER));
}

#[test]
fn infers_originals_from_both_conventions() {
    assert_eq!(
        original_for_backup(".image-rounding-backups/100/pics/cat.png", FOLDER),
        Some(("pics/cat.png".to_string(), Some(100)))
    );
    assert_eq!(
        original_for_backup("pics/cat.backup-100.png", FOLDER),
        Some(("pics/cat.png".to_string(), Some(100)))
    );
    assert_eq!(original_for_backup("pics/cat.backup-.png", FOLDER), None);
}

#[test]
fn lists_and_scans_backups() {
    let (_vault, mgr) = seeded();
    assert_eq!(mgr.list_backup_files().len(), 4);

    let scan = mgr.recovery_scan();
    let cat = scan
        .iter()
        .find(|c| c.backup_path == "pics/cat.backup-100.png")
        .unwrap();
    assert!(cat.original_exists);
    let dog = scan
        .iter()
        .find(|c| c.original_path.as_deref() == Some("notes/dog.jpg"))
        .unwrap();
    assert!(!dog.original_exists);
}

#[test]
fn restores_newest_backup_of_missing_originals_only() {
    let (vault, mgr) = seeded();
    let report = mgr.restore_missing_originals();
    assert_eq!(report.restored, vec!["notes/dog.jpg".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(vault.read("notes/dog.jpg").unwrap(), b"dog v2");
    assert_eq!(vault.read("pics/cat.png").unwrap(), b"rounded");
}

#[test]
fn cleanup_deletes_every_backup() {
    let (vault, mgr) = seeded();
    let report = mgr.cleanup_backups();
    assert_eq!(report.deleted, 4);
    assert!(mgr.list_backup_files().is_empty());
    assert_eq!(
        vault.list_all_files(),
        vec!["notes/today.md".to_string(), "pics/cat.png".to_string()]
    );
}
