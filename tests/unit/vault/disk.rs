use super::*;

#[test]
fn write_read_list_delete() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = DiskVault::new(tmp.path());

    vault.write("pics/cat.png", b"meow").unwrap();
    vault.write("notes/today.md", b"# hi").unwrap();
    assert!(vault.exists("pics/cat.png"));
    assert!(vault.exists("./pics/../pics/cat.png"));
    assert!(!vault.exists("pics"));
    assert_eq!(vault.read("pics/cat.png").unwrap(), b"meow");

    assert_eq!(
        vault.list_all_files(),
        vec!["notes/today.md".to_string(), "pics/cat.png".to_string()]
    );

    vault.delete("pics/cat.png").unwrap();
    assert!(!vault.exists("pics/cat.png"));
    let err = vault.read("pics/cat.png").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn refuses_paths_outside_root() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = DiskVault::new(tmp.path().join("inner"));
    let err = vault.write("../escape.png", b"x").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(!tmp.path().join("escape.png").exists());
}

#[test]
fn default_link_resolution_uses_file_index() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = DiskVault::new(tmp.path());
    vault.write("attachments/Photo.PNG", b"x").unwrap();
    assert_eq!(
        vault.resolve_link_path("photo.png", "notes/a.md").as_deref(),
        Some("attachments/Photo.PNG")
    );
}
