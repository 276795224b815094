use super::*;
use crate::rewrite::document::TextDocument;
use crate::vault::AssetHandle;
use crate::vault::memory::MemoryVault;
use std::sync::Arc;

const FOLDER: &str = ".image-rounding-backups";
const LEDGER: &str = ".image-rounding-ledger.json";

struct Fixture {
    vault: Arc<MemoryVault>,
    backups: BackupManager,
    entry: LedgerEntry,
}

/// Vault after a batch rounded `pics/cat.png` and rewrote one reference in `note.md`.
fn rounded_fixture() -> Fixture {
    let vault = Arc::new(MemoryVault::with_files([(
        "pics/cat.png",
        b"original cat".to_vec(),
    )]));
    let backups = BackupManager::new(vault.clone(), FOLDER);
    let record = backups.backup(&AssetHandle::new("pics/cat.png")).unwrap();
    vault
        .write("pics/cat-rounded-25p.png", b"rounded cat")
        .unwrap();

    let entry = LedgerEntry {
        original_paths: vec!["pics/cat.png".into()],
        backup_records: vec![record],
        new_paths: vec!["pics/cat-rounded-25p.png".into()],
        document_id: "note.md".into(),
        timestamp: 1,
        rewrites: vec![AppliedRewrite {
            line_index: 0,
            original_text: "![cat](pics/cat.png)".into(),
            replacement: "![cat](pics/cat-rounded-25p.png)".into(),
            new_link: "pics/cat-rounded-25p.png".into(),
        }],
        displaced_records: Vec::new(),
    };
    Fixture {
        vault,
        backups,
        entry,
    }
}

#[test]
fn record_requires_new_paths() {
    let fx = rounded_fixture();
    let mut ledger = ActionLedger::new();
    let empty = LedgerEntry {
        new_paths: Vec::new(),
        ..fx.entry.clone()
    };
    assert!(!ledger.record(empty));
    assert!(!ledger.has_pending());

    assert!(ledger.record(fx.entry.clone()));
    let newer = LedgerEntry {
        timestamp: 2,
        ..fx.entry
    };
    assert!(ledger.record(newer));
    assert_eq!(ledger.entry().map(|e| e.timestamp), Some(2));
}

#[test]
fn undo_restores_deletes_and_reverts() {
    let fx = rounded_fixture();
    fx.vault.write("pics/cat.png", b"clobbered").unwrap();
    let mut ledger = ActionLedger::new();
    ledger.record(fx.entry.clone());

    let mut doc = TextDocument::new("![cat](pics/cat-rounded-25p.png)\nmore");
    let outcome = ledger.undo(&fx.backups, Some(&mut doc));
    let LedgerOutcome::Undone(report) = outcome else {
        panic!("expected undo, got {outcome:?}");
    };
    assert_eq!(report.restored, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.references_reverted, 1);
    assert!(report.restore_failed.is_empty());

    assert_eq!(fx.vault.read("pics/cat.png").unwrap(), b"original cat");
    assert!(!fx.vault.exists("pics/cat-rounded-25p.png"));
    assert_eq!(doc.text(), "![cat](pics/cat.png)\nmore");
    for path in fx.entry.backup_records[0].paths() {
        assert!(!fx.vault.exists(path), "backup {path} should be gone");
    }

    assert_eq!(ledger.undo(&fx.backups, None), LedgerOutcome::NothingToDo);
}

#[test]
fn undo_without_backups_keeps_going() {
    let fx = rounded_fixture();
    for path in fx.entry.backup_records[0].paths() {
        fx.vault.delete(path).unwrap();
    }
    let mut ledger = ActionLedger::new();
    ledger.record(fx.entry);

    let LedgerOutcome::Undone(report) = ledger.undo(&fx.backups, None) else {
        panic!("expected undo");
    };
    assert_eq!(report.restored, 0);
    assert_eq!(report.restore_failed.len(), 1);
    assert_eq!(report.deleted, 1);
    assert!(!ledger.has_pending());
}

#[test]
fn confirm_discards_backups_and_keeps_assets() {
    let fx = rounded_fixture();
    let mut ledger = ActionLedger::new();
    ledger.record(fx.entry.clone());

    assert_eq!(
        ledger.confirm(&fx.backups),
        LedgerOutcome::Confirmed(ConfirmReport {
            backups_discarded: 1
        })
    );
    assert!(fx.vault.exists("pics/cat-rounded-25p.png"));
    for path in fx.entry.backup_records[0].paths() {
        assert!(!fx.vault.exists(path));
    }
    assert_eq!(ledger.confirm(&fx.backups), LedgerOutcome::NothingToDo);
}

#[test]
fn save_and_load_through_the_vault() {
    let fx = rounded_fixture();
    let vault: &dyn Vault = fx.vault.as_ref();
    assert!(!ActionLedger::load(vault, LEDGER).unwrap().has_pending());

    let mut ledger = ActionLedger::new();
    ledger.record(fx.entry.clone());
    ledger.save(vault, LEDGER).unwrap();
    let loaded = ActionLedger::load(vault, LEDGER).unwrap();
    assert_eq!(loaded.entry(), Some(&fx.entry));

    ActionLedger::new().save(vault, LEDGER).unwrap();
    assert!(!vault.exists(LEDGER));
    ActionLedger::new().save(vault, LEDGER).unwrap();
}

#[test]
fn corrupt_ledger_is_an_error() {
    let vault = MemoryVault::with_files([(LEDGER, b"{not json".to_vec())]);
    assert!(ActionLedger::load(&vault, LEDGER).is_err());
}

#[test]
fn undo_puts_back_an_output_that_existed_before_the_batch() {
    let vault = Arc::new(MemoryVault::with_files([
        ("pics/cat.png", b"original cat".to_vec()),
        ("pics/cat-rounded-25p.png", b"earlier rounded cat".to_vec()),
    ]));
    let backups = BackupManager::new(vault.clone(), FOLDER);
    let record = backups.backup(&AssetHandle::new("pics/cat.png")).unwrap();
    let displaced = backups
        .backup(&AssetHandle::new("pics/cat-rounded-25p.png"))
        .unwrap();
    vault
        .write("pics/cat-rounded-25p.png", b"rounded again")
        .unwrap();

    let mut ledger = ActionLedger::new();
    ledger.record(LedgerEntry {
        original_paths: vec!["pics/cat.png".into()],
        backup_records: vec![record],
        new_paths: vec!["pics/cat-rounded-25p.png".into()],
        document_id: "b.md".into(),
        timestamp: 1,
        rewrites: Vec::new(),
        displaced_records: vec![displaced.clone()],
    });

    let LedgerOutcome::Undone(report) = ledger.undo(&backups, None) else {
        panic!("expected undo");
    };
    assert_eq!(report.restored, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.replaced_restored, 1);
    assert_eq!(
        vault.read("pics/cat-rounded-25p.png").unwrap(),
        b"earlier rounded cat"
    );
    for path in displaced.paths() {
        assert!(!vault.exists(path), "backup {path} should be gone");
    }
}

#[test]
fn confirm_also_discards_backups_of_replaced_outputs() {
    let fx = rounded_fixture();
    let displaced = fx
        .backups
        .backup(&AssetHandle::new("pics/cat-rounded-25p.png"))
        .unwrap();
    let mut ledger = ActionLedger::new();
    ledger.record(LedgerEntry {
        displaced_records: vec![displaced.clone()],
        ..fx.entry
    });

    assert_eq!(
        ledger.confirm(&fx.backups),
        LedgerOutcome::Confirmed(ConfirmReport {
            backups_discarded: 2
        })
    );
    for path in displaced.paths() {
        assert!(!fx.vault.exists(path));
    }
}
