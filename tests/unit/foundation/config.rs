use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = RounderConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.concurrency, 3);
    assert_eq!(cfg.transform_timeout(), Duration::from_secs(30));
    assert!(cfg.external.is_none());
}

#[test]
fn partial_json_fills_defaults() {
    let json = r#"{ "concurrency": 2, "external": { "program": "python3", "args": ["round_image.py"] } }"#;
    let cfg = RounderConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.concurrency, 2);
    assert_eq!(cfg.backup_folder, DEFAULT_BACKUP_FOLDER);
    let ext = cfg.external.unwrap();
    assert_eq!(ext.program, "python3");
    assert_eq!(ext.args, vec!["round_image.py".to_string()]);
}

#[test]
fn rejects_bad_values() {
    let zero = RounderConfig {
        concurrency: 0,
        ..RounderConfig::default()
    };
    assert!(zero.validate().is_err());

    let nested = RounderConfig {
        backup_folder: "a/b".to_string(),
        ..RounderConfig::default()
    };
    assert!(nested.validate().is_err());

    let no_timeout = RounderConfig {
        transform_timeout_secs: 0,
        ..RounderConfig::default()
    };
    assert!(no_timeout.validate().is_err());

    assert!(RounderConfig::from_reader(r#"{ "concurrency": "x" }"#.as_bytes()).is_err());
}
