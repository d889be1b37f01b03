// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

const SSHD_CONF: &str = r#"
    [[process]]
    kind = "main"
    command = "/usr/sbin/sshd -D"
"#;

#[test]
fn add_source_does_not_parse_immediately() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    assert_eq!(manager.classes().count(), 0);
}

#[test]
fn reload_installs_classes_from_disk() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    let outcome = manager.reload(None, &NoLiveInstances).unwrap();
    assert_eq!(outcome.installed.len(), 1);
    assert!(outcome.errors.is_empty());
    let session = SessionId::new("null");
    assert!(manager.select_job("sshd", &session).is_some());
}

#[test]
fn reload_sweeps_removed_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    manager.reload(None, &NoLiveInstances).unwrap();

    fs::remove_file(dir.path().join("sshd.conf")).unwrap();
    let outcome = manager.reload(None, &NoLiveInstances).unwrap();
    assert_eq!(outcome.freed.len(), 1);
    let session = SessionId::new("null");
    assert!(manager.select_job("sshd", &session).is_none());
}

#[test]
fn reload_keeps_deleted_class_alive_with_live_instances() {
    struct AlwaysLive;
    impl LiveInstanceOracle for AlwaysLive {
        fn has_live_instances(&self, _class: &ClassId) -> bool {
            true
        }
    }

    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    manager.reload(None, &NoLiveInstances).unwrap();

    fs::remove_file(dir.path().join("sshd.conf")).unwrap();
    manager.reload(None, &AlwaysLive).unwrap();

    let session = SessionId::new("null");
    assert!(manager.select_job("sshd", &session).is_none());
    let class_id = JobClassDefinition::derive_id(&session, "sshd");
    assert!(manager.class(&class_id).is_some_and(|c| c.deleted));
}

#[test]
fn modifying_a_conf_file_with_live_instances_shadows_instead_of_overwriting() {
    struct AlwaysLive;
    impl LiveInstanceOracle for AlwaysLive {
        fn has_live_instances(&self, _class: &ClassId) -> bool {
            true
        }
    }

    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    manager.reload(None, &NoLiveInstances).unwrap();

    let session = SessionId::new("null");
    let original_id = JobClassDefinition::derive_id(&session, "sshd");
    assert_eq!(manager.class(&original_id).unwrap().kill_timeout_secs, 5);

    write(
        dir.path(),
        "sshd.conf",
        "kill_timeout_secs = 42\n\n[[process]]\nkind = \"main\"\ncommand = \"/usr/sbin/sshd -D\"\n",
    );
    let outcome = manager.reload(None, &AlwaysLive).unwrap();
    assert_eq!(outcome.shadowed.len(), 1);
    assert!(outcome.installed.is_empty());

    // The running instance's class is untouched at its original id.
    let old = manager
        .class(&original_id)
        .expect("old definition stays reachable under its original id");
    assert!(old.deleted);
    assert_eq!(old.kill_timeout_secs, 5);

    // Future instances pick up the new definition instead.
    let current = manager
        .select_job("sshd", &session)
        .expect("new definition is selectable");
    assert!(!current.deleted);
    assert_eq!(current.kill_timeout_secs, 42);
    assert_ne!(manager.select_job_id("sshd", &session).unwrap(), original_id);

    // Once the instance stops, the next reload frees the old definition.
    manager.reload(None, &NoLiveInstances).unwrap();
    assert!(manager.class(&original_id).is_none());
    assert_eq!(
        manager
            .select_job("sshd", &session)
            .unwrap()
            .kill_timeout_secs,
        42
    );
}

#[test]
fn overlay_is_applied_on_top_of_primary() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    write(
        dir.path(),
        "sshd.override",
        "kill_timeout_secs = 42\n",
    );
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    manager.reload(None, &NoLiveInstances).unwrap();

    let session = SessionId::new("null");
    let class = manager.select_job("sshd", &session).unwrap();
    assert_eq!(class.kill_timeout_secs, 42);
}

#[test]
fn ignored_files_are_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    write(dir.path(), ".sshd.conf.swp", SSHD_CONF);
    write(dir.path(), "sshd.conf~", SSHD_CONF);
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    let outcome = manager.reload(None, &NoLiveInstances).unwrap();
    assert_eq!(outcome.installed.len(), 1);
}

#[test]
fn parse_error_does_not_prevent_other_files_installing() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sshd.conf", SSHD_CONF);
    write(dir.path(), "broken.conf", "not valid toml {{{");
    let mut manager = ConfigManager::new();
    manager.add_source(dir.path(), SourceKind::JobDir, None);
    let outcome = manager.reload(None, &NoLiveInstances).unwrap();
    assert_eq!(outcome.installed.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
}
