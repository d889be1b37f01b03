// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

const SSHD_CONF: &str = r#"
    [[process]]
    kind = "main"
    command = "/usr/sbin/sshd -D"
"#;

#[test]
fn primary_name_comes_from_file_stem() {
    let class = parse_primary(Path::new("/etc/init/sshd.conf"), SSHD_CONF).unwrap();
    assert_eq!(class.name, "sshd");
    assert_eq!(class.process.len(), 1);
}

#[test]
fn missing_command_is_rejected() {
    let bad = r#"
        [[process]]
        kind = "main"
        command = ""
    "#;
    let err = parse_primary(Path::new("/etc/init/broken.conf"), bad).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCommand { .. }));
}

#[test]
fn no_process_slots_is_rejected() {
    let err = parse_primary(Path::new("/etc/init/empty.conf"), "").unwrap_err();
    assert!(matches!(err, ConfigError::Semantic { .. }));
}

#[test]
fn overlay_changes_only_named_fields() {
    let base = parse_primary(Path::new("/etc/init/sshd.conf"), SSHD_CONF).unwrap();
    let overlay = r#"
        description = "overlaid"
        kill_timeout_secs = 30
    "#;
    let merged = apply_overlay(Path::new("/etc/init/sshd.override"), overlay, base).unwrap();
    assert_eq!(merged.name, "sshd");
    assert_eq!(merged.description.as_deref(), Some("overlaid"));
    assert_eq!(merged.kill_timeout_secs, 30);
    assert_eq!(merged.process.len(), 1);
}

#[test]
fn zero_respawn_interval_is_rejected() {
    let bad = r#"
        [[process]]
        kind = "main"
        command = "/usr/sbin/sshd -D"

        [respawn]
        enabled = true
        interval_secs = 0
    "#;
    let err = parse_primary(Path::new("/etc/init/sshd.conf"), bad).unwrap_err();
    assert!(matches!(err, ConfigError::Semantic { .. }));
}
