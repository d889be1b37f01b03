// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session isolation contexts.
//!
//! A session is identified by `(chroot, uid)`. The null session — no
//! chroot, uid 0 — represents the privileged system context that every
//! init daemon starts in.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a session, derived from its `(chroot, uid)` identity.
    pub struct SessionId;
}

/// An isolation context: optional chroot path, owning uid, and the config
/// path derived from the two (either the system root or a chroot-relative
/// equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub chroot: Option<PathBuf>,
    pub uid: u32,
    pub conf_path: PathBuf,
}

impl Session {
    /// The distinguished "null session": no chroot, uid 0, system conf root.
    pub fn null(conf_root: impl Into<PathBuf>) -> Self {
        let conf_path = conf_root.into();
        Self {
            id: SessionId::new("null"),
            chroot: None,
            uid: 0,
            conf_path,
        }
    }

    pub fn is_null(&self) -> bool {
        self.chroot.is_none() && self.uid == 0
    }

    /// Derive the stable identity key `(chroot, uid)` this session is keyed by.
    pub fn identity(&self) -> (Option<&PathBuf>, u32) {
        (self.chroot.as_ref(), self.uid)
    }

    /// Construct a session id from its `(chroot, uid)` identity, matching
    /// how a registry looks up an existing session before creating a new one.
    pub fn derive_id(chroot: Option<&PathBuf>, uid: u32) -> SessionId {
        match chroot {
            Some(path) => SessionId::new(format!("{}:{}", path.display(), uid)),
            None if uid == 0 => SessionId::new("null"),
            None => SessionId::new(format!(":{}", uid)),
        }
    }
}

/// Registry of known sessions, keyed by `(chroot, uid)` identity.
///
/// The null session is held in its own field rather than inside `extra`,
/// so looking it up can never fail: its presence is a type-level
/// guarantee, not a runtime assertion over the general map.
#[derive(Debug)]
pub struct SessionRegistry {
    null: Session,
    extra: std::collections::HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new(conf_root: impl Into<PathBuf>) -> Self {
        Self {
            null: Session::null(conf_root),
            extra: std::collections::HashMap::new(),
        }
    }

    pub fn null_session(&self) -> &Session {
        &self.null
    }

    /// Register a session for a chroot/uid pair, or return the existing one.
    pub fn get_or_create(
        &mut self,
        chroot: Option<PathBuf>,
        uid: u32,
        conf_path: PathBuf,
    ) -> &Session {
        let id = Session::derive_id(chroot.as_ref(), uid);
        if id == self.null.id {
            return &self.null;
        }
        self.extra.entry(id.clone()).or_insert_with(|| Session {
            id,
            chroot,
            uid,
            conf_path,
        })
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        if *id == self.null.id {
            return Some(&self.null);
        }
        self.extra.get(id)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        if *id == self.null.id {
            return None;
        }
        self.extra.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        std::iter::once(&self.null).chain(self.extra.values())
    }

    /// Rebuild a registry from a persisted session list (as produced by
    /// iterating [`SessionRegistry::iter`] before re-exec). The null
    /// session is re-derived from `conf_root` rather than trusted from the
    /// document, since it is a fixed identity, not state.
    pub fn restore(conf_root: impl Into<PathBuf>, sessions: Vec<Session>) -> Self {
        let null = Session::null(conf_root);
        let extra = sessions
            .into_iter()
            .filter(|s| s.id != null.id)
            .map(|s| (s.id.clone(), s))
            .collect();
        Self { null, extra }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
