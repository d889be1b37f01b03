// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bump_reload_flag_increments() {
    let mut source = ConfigSource::new(
        SourceId::new("src-1"),
        PathBuf::from("/etc/init"),
        SourceKind::JobDir,
        None,
    );
    assert_eq!(source.bump_reload_flag(), 1);
    assert_eq!(source.bump_reload_flag(), 2);
}

#[test]
fn sweep_stale_removes_unstamped_files() {
    let mut source = ConfigSource::new(
        SourceId::new("src-1"),
        PathBuf::from("/etc/init"),
        SourceKind::JobDir,
        None,
    );
    source.bump_reload_flag();
    let survivor = PathBuf::from("/etc/init/sshd.conf");
    let removed = PathBuf::from("/etc/init/cron.conf");
    source
        .files
        .insert(survivor.clone(), ConfigFile::new(survivor.clone(), 1));
    source
        .files
        .insert(removed.clone(), ConfigFile::new(removed.clone(), 0));

    let stale = source.sweep_stale();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].path, removed);
    assert!(source.files.contains_key(&survivor));
    assert!(!source.files.contains_key(&removed));
}
