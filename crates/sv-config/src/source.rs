// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config Source / Config File records.

use std::collections::HashMap;
use std::path::PathBuf;
use sv_core::{JobClassDefinition, SessionId, SourceId};

/// What a config source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    /// A single arbitrary config file.
    File,
    /// A directory of arbitrary config files (non-job payloads).
    Dir,
    /// A directory of job-class `.conf`/`.override` files.
    JobDir,
}

/// One config file tracked under a source: its path, the `reload_flag`
/// stamp from the rescan that last saw it, and (for `JobDir` sources) the
/// parsed payload.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub reload_flag: u64,
    pub payload: Option<JobClassDefinition>,
}

impl ConfigFile {
    pub fn new(path: PathBuf, reload_flag: u64) -> Self {
        Self {
            path,
            reload_flag,
            payload: None,
        }
    }
}

/// A registered config source: a file, a directory, or a directory of job
/// class files.
pub struct ConfigSource {
    pub id: SourceId,
    pub path: PathBuf,
    pub kind: SourceKind,
    pub session: Option<SessionId>,
    pub reload_flag: u64,
    pub files: HashMap<PathBuf, ConfigFile>,
}

impl ConfigSource {
    pub fn new(id: SourceId, path: PathBuf, kind: SourceKind, session: Option<SessionId>) -> Self {
        Self {
            id,
            path,
            kind,
            session,
            reload_flag: 0,
            files: HashMap::new(),
        }
    }

    /// Flip the reload flag ahead of a rescan; every file/class that
    /// survives the walk gets re-stamped with this new value.
    pub fn bump_reload_flag(&mut self) -> u64 {
        self.reload_flag = self.reload_flag.wrapping_add(1);
        self.reload_flag
    }

    /// Remove and return every file whose stamp doesn't match the current
    /// `reload_flag` — these are the ones that disappeared during the walk.
    pub fn sweep_stale(&mut self) -> Vec<ConfigFile> {
        let current = self.reload_flag;
        let stale_paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, f)| f.reload_flag != current)
            .map(|(p, _)| p.clone())
            .collect();
        stale_paths
            .into_iter()
            .filter_map(|p| self.files.remove(&p))
            .collect()
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
