//! Integration tests for deferred mode: load, edit in memory, save, and
//! verify with a fresh direct-mode store.

use std::path::PathBuf;

use confman_core::{ConfigError, ConfigStore, ManagerOptions, Mode, PendingOp};
use uuid::Uuid;

const DOC: &str = "\
[CONFIG_ARGS]
host = localhost
port = 8080

[Server]
url = http://%host%:%port%/api
timeout = 30

# legacy settings
[Legacy]
flag = on

[Client]
retries = 3
";

fn temp_config(content: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("confman_deferred_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("app.conf");
    std::fs::write(&path, content).expect("write config");
    (dir, path)
}

#[test]
fn test_save_applies_every_kind_of_change() {
    // Arrange
    let (dir, path) = temp_config(DOC);
    let mut store = ManagerOptions::new(&path).open_deferred().unwrap();

    // Act
    store.update(Some("Server"), "timeout", "60").unwrap();
    store.create(Some("Server"), "retries", "%port%").unwrap();
    store.delete(Some("Client"), "retries").unwrap();
    store.delete_section("Legacy").unwrap();
    store.set(Some("Cache"), "size", "64").unwrap();
    let written = store.save().unwrap();

    // Assert
    assert_eq!(written, 6);
    let expected = "\
[CONFIG_ARGS]
host = localhost
port = 8080

[Server]
url = http://%host%:%port%/api
timeout = 60
retries = %port%

# legacy settings

[Client]

[Cache]
size = 64
";
    assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);

    let direct = ManagerOptions::new(&path).open_direct().unwrap();
    assert_eq!(direct.get(Some("Server"), "retries").unwrap(), "8080");
    assert_eq!(direct.get(Some("Cache"), "size").unwrap(), "64");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_enumeration_skips_pending_deletions_in_declaration_order() {
    let (dir, path) = temp_config(DOC);
    let mut store = ManagerOptions::new(&path).open_deferred().unwrap();

    store.delete_section("Legacy").unwrap();
    store.create_section("Zeta").unwrap();
    store.create_section("Alpha").unwrap();

    assert_eq!(
        store.sections().collect::<Vec<_>>(),
        vec!["Server", "Client", "Zeta", "Alpha"]
    );
    assert!(matches!(
        store.create_section("Legacy"),
        Err(ConfigError::PendingDeletion(_))
    ));
    assert!(matches!(
        store.create_section("Server"),
        Err(ConfigError::SectionExists(_))
    ));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_save_preserves_external_additions() {
    // Arrange
    let (dir, path) = temp_config(DOC);
    let mut store = ManagerOptions::new(&path).open_deferred().unwrap();
    store.update(Some("Client"), "retries", "5").unwrap();

    // Act: someone else adds a line before we save.
    let external = DOC.replace("retries = 3\n", "retries = 3\nbackoff = 2\n");
    std::fs::write(&path, &external).unwrap();
    store.save().unwrap();

    // Assert
    let saved = std::fs::read_to_string(&path).unwrap();
    assert_eq!(saved, external.replace("retries = 3", "retries = 5"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_tags_reset_after_save_and_second_save_is_noop() {
    let (dir, path) = temp_config(DOC);
    let mut store = ManagerOptions::new(&path).open_deferred().unwrap();
    store.set(Some("Server"), "timeout", "10").unwrap();
    assert_eq!(
        store.section("Server").unwrap().entry("timeout").unwrap().pending(),
        PendingOp::Update
    );

    store.save().unwrap();
    let after_first = std::fs::read_to_string(&path).unwrap();

    assert_eq!(store.pending_changes(), 0);
    assert_eq!(store.save().unwrap(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), after_first);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_scoped_deferred_store_materializes_only_its_section() {
    let (dir, path) = temp_config(DOC);
    let mut store = ManagerOptions::new(&path)
        .with_section("Client")
        .open_deferred()
        .unwrap();

    assert_eq!(store.sections().collect::<Vec<_>>(), vec!["Client"]);
    store.create(None, "timeout", "5").unwrap();
    store.save().unwrap();

    let saved = std::fs::read_to_string(&path).unwrap();
    assert_eq!(saved, DOC.replace("retries = 3\n", "retries = 3\ntimeout = 5\n"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_open_store_deferred_through_trait_object() {
    let (dir, path) = temp_config(DOC);
    let mut store =
        confman_core::open_store(&ManagerOptions::new(&path).with_mode(Mode::Deferred)).unwrap();

    store.create(Some("Client"), "timeout", "5").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), DOC, "nothing written before save");
    assert_eq!(store.get(Some("Server"), "url").unwrap(), "http://localhost:8080/api");
    assert_eq!(store.save().unwrap(), 1);
    assert!(std::fs::read_to_string(&path).unwrap().contains("timeout = 5\n"));

    std::fs::remove_dir_all(&dir).ok();
}
