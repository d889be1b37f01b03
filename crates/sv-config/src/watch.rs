// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem watch for a `JobDir` config source. On watch creation
//! failure the manager logs and falls back to polling; the one-shot
//! rescan produces correct state regardless of whether a watch is live.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use sv_core::SourceId;
use tokio::sync::mpsc;

/// A change notification for one source, coalesced to "something under
/// this root changed" — the manager always does a full rescan rather than
/// reacting to individual paths, matching the spec's "atomic rescan"
/// operation.
#[derive(Debug, Clone)]
pub struct SourceChanged(pub SourceId);

/// Install a recursive watch on `path`, forwarding a coalesced change
/// notification for `source` into `tx` on every filesystem event.
pub fn install(
    source: SourceId,
    path: &Path,
    tx: mpsc::Sender<SourceChanged>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(SourceChanged(source.clone()));
        }
    })?;
    watcher.watch(path, RecursiveMode::Recursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
