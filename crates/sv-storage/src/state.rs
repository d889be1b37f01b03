// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-pass reconstruction of a live [`Supervisor`] from a persisted
//! document: pass one rebuilds every entity (sessions, job classes, job
//! instances, config sources) by its stable id; pass two re-links the
//! cross-entity references — a class's `session`, an event's `blockers`,
//! a job's owning class — by looking that id back up in the just-built
//! collections, exactly as `Blocked`'s waiter/waited-on edges were always
//! meant to be resolved. `sv_engine::Supervisor::restore` is where both
//! passes actually happen; this module is the `sv-storage`-side entry
//! point spec.md §9's REDESIGN FLAG names.

use std::path::PathBuf;
use sv_core::Clock;
use sv_engine::Supervisor;

use crate::document::PersistedDocument;

/// Rebuild a `Supervisor` from a persisted document. Callers must
/// `reload()` every restored config source immediately afterwards — the
/// document does not carry per-file watch bookkeeping, only the set of
/// sources and the classes they last contributed.
pub fn rehydrate<C: Clock>(
    clock: C,
    conf_root: impl Into<PathBuf>,
    doc: PersistedDocument,
) -> Supervisor<C> {
    Supervisor::restore(clock, conf_root, doc.state)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
