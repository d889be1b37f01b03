// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Configuration Manager: owns config sources, performs atomic
//! rescans, and answers `select_job` lookups by source priority.

use crate::error::ConfigError;
use crate::ignore::{classify, job_name_of, FileRole};
use crate::parse::{apply_overlay, parse_primary};
use crate::source::{ConfigFile, ConfigSource, SourceKind};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use sv_core::{ClassId, IdGen, JobClassDefinition, SequentialIdGen, SessionId, SourceId};

/// Outcome of one `reload()` call: which classes were newly installed,
/// which were shadowed-but-kept-alive because live instances remain, and
/// which were freed outright.
#[derive(Debug, Default)]
pub struct ReloadOutcome {
    pub installed: Vec<ClassId>,
    pub shadowed: Vec<ClassId>,
    pub freed: Vec<ClassId>,
    pub errors: Vec<ConfigError>,
}

/// Tells the manager whether a class has live instances, so a reload knows
/// whether to replace it outright or mark it `deleted` and shadow it
/// instead. Job instance lifetime is owned by `sv-engine`, not here.
pub trait LiveInstanceOracle {
    fn has_live_instances(&self, class: &ClassId) -> bool;
}

/// An oracle that always reports no live instances, useful for tests and
/// for a manager used purely as a parser/watcher ahead of any engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLiveInstances;

impl LiveInstanceOracle for NoLiveInstances {
    fn has_live_instances(&self, _class: &ClassId) -> bool {
        false
    }
}

/// Registered sources in registration (= priority) order, plus the classes
/// each source currently contributes, keyed by `ClassId`.
pub struct ConfigManager {
    ids: SequentialIdGen,
    sources: IndexMap<SourceId, ConfigSource>,
    classes: IndexMap<ClassId, JobClassDefinition>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            ids: SequentialIdGen::new("src"),
            sources: IndexMap::new(),
            classes: IndexMap::new(),
        }
    }

    /// Register a source. Configuration is not parsed until `reload` runs.
    pub fn add_source(
        &mut self,
        path: impl Into<PathBuf>,
        kind: SourceKind,
        session: Option<SessionId>,
    ) -> SourceId {
        let id = SourceId::new(self.ids.next());
        self.sources.insert(
            id.clone(),
            ConfigSource::new(id.clone(), path.into(), kind, session),
        );
        id
    }

    pub fn source(&self, id: &SourceId) -> Option<&ConfigSource> {
        self.sources.get(id)
    }

    /// Perform an atomic rescan of one source, or all of them if `None`.
    pub fn reload(
        &mut self,
        source: Option<&SourceId>,
        oracle: &impl LiveInstanceOracle,
    ) -> Result<ReloadOutcome, ConfigError> {
        let mut outcome = ReloadOutcome::default();
        let ids: Vec<SourceId> = match source {
            Some(id) => vec![id.clone()],
            None => self.sources.keys().cloned().collect(),
        };
        for id in ids {
            self.reload_one(&id, oracle, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn reload_one(
        &mut self,
        id: &SourceId,
        oracle: &impl LiveInstanceOracle,
        outcome: &mut ReloadOutcome,
    ) -> Result<(), ConfigError> {
        let Some(source) = self.sources.get_mut(id) else {
            return Err(ConfigError::UnknownSource(id.clone()));
        };
        if source.kind != SourceKind::JobDir {
            // Arbitrary (non-job) sources are tracked but not parsed into
            // classes; only stat/walk bookkeeping applies.
            source.bump_reload_flag();
            return Ok(());
        }
        let flag = source.bump_reload_flag();
        let root = source.path.clone();
        let session = source.session.clone();

        let entries = match walk(&root) {
            Ok(entries) => entries,
            Err(err) => {
                outcome.errors.push(ConfigError::Io {
                    path: root.clone(),
                    source: err,
                });
                return Ok(());
            }
        };

        let mut primaries: Vec<PathBuf> = Vec::new();
        for (path, role) in &entries {
            if *role == FileRole::Primary {
                primaries.push(path.clone());
            }
        }

        for path in primaries {
            match self.reload_path(id, &path, flag, &session, oracle) {
                Ok(event) => match event {
                    ReloadEvent::Installed(class_id) => outcome.installed.push(class_id),
                    ReloadEvent::Shadowed(class_id) => outcome.shadowed.push(class_id),
                },
                Err(err) => outcome.errors.push(err),
            }
        }

        let Some(source) = self.sources.get_mut(id) else {
            return Err(ConfigError::UnknownSource(id.clone()));
        };
        for stale in source.sweep_stale() {
            if let Some(stem) = job_name_of(&stale.path) {
                let session_id = session.clone().unwrap_or_else(fallback_session);
                let class_id = self
                    .current_class_id(&session_id, stem)
                    .unwrap_or_else(|| JobClassDefinition::derive_id(&session_id, stem));
                if oracle.has_live_instances(&class_id) {
                    if let Some(class) = self.classes.get_mut(&class_id) {
                        class.deleted = true;
                    }
                } else {
                    self.classes.shift_remove(&class_id);
                }
                outcome.freed.push(class_id);
            }
        }

        // Any class already marked deleted — by the sweep above, or by a
        // prior reload's file-modification shadowing below — is freed for
        // good the moment its last live instance is gone.
        self.classes
            .retain(|id, class| !class.deleted || oracle.has_live_instances(id));

        Ok(())
    }

    /// Parse one primary file and install its class, honoring a previous
    /// live-instance shadow: a class with running instances is never
    /// overwritten in place. Instead the old definition stays at its
    /// original id (marked `deleted`) so those instances keep resolving to
    /// it, and the new definition is installed under a distinct generation
    /// id that `select_job` picks up for every future instance.
    fn reload_path(
        &mut self,
        source_id: &SourceId,
        path: &Path,
        flag: u64,
        session: &Option<SessionId>,
        oracle: &impl LiveInstanceOracle,
    ) -> Result<ReloadEvent, ConfigError> {
        let job_name = job_name_of(path).ok_or_else(|| ConfigError::Semantic {
            path: path.to_path_buf(),
            message: "unreadable file stem".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut class = parse_primary(path, &content)?;

        if let Some(overlay_path) = self.find_overlay(source_id, job_name) {
            let overlay_content =
                std::fs::read_to_string(&overlay_path).map_err(|source| ConfigError::Io {
                    path: overlay_path.clone(),
                    source,
                })?;
            class = apply_overlay(&overlay_path, &overlay_content, class)?;
        }

        let session_id = session.clone().unwrap_or_else(fallback_session);
        class.session = Some(session_id.clone());

        // Pivot off whatever id is currently authoritative for this name —
        // the first install, or the last generation a previous reload left
        // behind — not a freshly re-derived key, since a class already once
        // shadowed lives under a generation id rather than its original one.
        let current_id = self.current_class_id(&session_id, job_name);
        let shadow = current_id
            .as_ref()
            .is_some_and(|id| oracle.has_live_instances(id));

        let class_id = match current_id {
            Some(id) if shadow => {
                if let Some(existing) = self.classes.get_mut(&id) {
                    existing.deleted = true;
                }
                ClassId::new(format!("{}@{flag}", id.as_str()))
            }
            Some(id) => id,
            None => JobClassDefinition::derive_id(&session_id, job_name),
        };
        self.classes.insert(class_id.clone(), class);

        let Some(source) = self.sources.get_mut(source_id) else {
            return Err(ConfigError::UnknownSource(source_id.clone()));
        };
        source.files.insert(
            path.to_path_buf(),
            ConfigFile {
                path: path.to_path_buf(),
                reload_flag: flag,
                payload: self.classes.get(&class_id).cloned(),
            },
        );

        Ok(if shadow {
            ReloadEvent::Shadowed(class_id)
        } else {
            ReloadEvent::Installed(class_id)
        })
    }

    /// Search `.override` files for `job_name` across every source in
    /// priority order, never below the primary file's own source.
    fn find_overlay(&self, primary_source: &SourceId, job_name: &str) -> Option<PathBuf> {
        for (id, source) in &self.sources {
            if source.kind != SourceKind::JobDir {
                continue;
            }
            for path in source.files.keys() {
                if job_name_of(path) == Some(job_name)
                    && classify(path) == Some(FileRole::Overlay)
                {
                    return Some(path.clone());
                }
            }
            if id == primary_source {
                // Also check the filesystem directly since overlays may not
                // yet be tracked as a ConfigFile on first install.
                let candidate = source.path.join(format!("{job_name}.override"));
                if candidate.exists() {
                    return Some(candidate);
                }
                break;
            }
        }
        None
    }

    /// The id of the one non-deleted entry for this `(session, name)` pair,
    /// whatever key it currently lives under. A reload that shadowed the
    /// class installs its new definition under a generation id distinct
    /// from the old (now `deleted`) one, so a plain key derivation is no
    /// longer enough to find it.
    fn current_class_id(&self, session: &SessionId, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .find(|(_, c)| !c.deleted && c.name == name && c.session.as_ref() == Some(session))
            .map(|(id, _)| id.clone())
    }

    /// Choose among visible classes for `name` by source priority (first
    /// source wins).
    pub fn select_job(&self, name: &str, session: &SessionId) -> Option<&JobClassDefinition> {
        let id = self.current_class_id(session, name)?;
        self.classes.get(&id)
    }

    /// The id `select_job` would resolve to, for callers that need the key
    /// itself (the engine caches classes by id, not name).
    pub fn select_job_id(&self, name: &str, session: &SessionId) -> Option<ClassId> {
        self.current_class_id(session, name)
    }

    pub fn class(&self, id: &ClassId) -> Option<&JobClassDefinition> {
        self.classes.get(id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &JobClassDefinition> {
        self.classes.values()
    }

    /// Every currently-tracked class keyed by its actual storage id,
    /// including shadowed (`deleted`) generations still serving live
    /// instances — callers that cache by id (the engine) must mirror these
    /// keys exactly rather than re-deriving them from `(session, name)`.
    pub fn classes_keyed(&self) -> impl Iterator<Item = (&ClassId, &JobClassDefinition)> {
        self.classes.iter()
    }

    /// The identity of every registered source, for persisting alongside
    /// the classes they contributed. Per-file watch bookkeeping
    /// (`reload_flag`, parsed `ConfigFile`s) is intentionally not part of
    /// this: it is rebuilt by the next `reload()` walking the filesystem
    /// again, which a re-exec always performs before resuming the main
    /// loop (§4.5).
    pub fn source_records(&self) -> Vec<ConfSourceRecord> {
        self.sources
            .values()
            .map(|s| ConfSourceRecord {
                id: s.id.clone(),
                path: s.path.clone(),
                kind: s.kind,
                session: s.session.clone(),
            })
            .collect()
    }

    /// Rebuild a manager from persisted sources and classes. Callers are
    /// expected to `reload()` every source immediately afterwards so
    /// per-file watch state (absent from the persisted document) is
    /// repopulated before the main loop resumes.
    pub fn restore(records: Vec<ConfSourceRecord>, classes: Vec<(ClassId, JobClassDefinition)>) -> Self {
        let mut highest = 0u64;
        let mut sources = IndexMap::new();
        for record in records {
            if let Some(n) = record.id.as_str().rsplit('-').next().and_then(|s| s.parse().ok()) {
                highest = highest.max(n);
            }
            sources.insert(
                record.id.clone(),
                ConfigSource::new(record.id, record.path, record.kind, record.session),
            );
        }
        Self {
            ids: SequentialIdGen::starting_at("src", highest + 1),
            sources,
            classes: classes.into_iter().collect(),
        }
    }
}

/// A registered source's identity, without its per-file watch state — the
/// `conf_sources` document entry of spec.md §6.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfSourceRecord {
    pub id: SourceId,
    pub path: PathBuf,
    pub kind: SourceKind,
    #[serde(default)]
    pub session: Option<SessionId>,
}

enum ReloadEvent {
    Installed(ClassId),
    Shadowed(ClassId),
}

fn fallback_session() -> SessionId {
    SessionId::new("null")
}

fn walk(root: &Path) -> std::io::Result<Vec<(PathBuf, FileRole)>> {
    let mut out = Vec::new();
    if root.is_file() {
        if let Some(role) = classify(root) {
            out.push((root.to_path_buf(), role));
        }
        return Ok(out);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Some(role) = classify(&path) {
                out.push((path, role));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
