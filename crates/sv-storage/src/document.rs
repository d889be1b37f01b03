// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-the-wire shape of spec.md §6's persisted-state document: a
//! schema version plus the [`sv_engine::EngineSnapshot`] it wraps.
//! Shared by both the re-exec hand-off (written to an inherited fd,
//! uncompressed, read back immediately by the new process image) and the
//! periodic on-disk checkpoint (compressed, read back on the next cold
//! start after a crash).

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use sv_engine::EngineSnapshot;

use crate::error::StorageError;

/// Bumped whenever [`EngineSnapshot`]'s shape changes in a way an older
/// reader couldn't tolerate via §6's own forward-compat rules (a brand
/// new top-level key, not an added optional field — those are handled by
/// `#[serde(default)]` on the field itself and never need a version bump).
pub const CURRENT_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(rename = "v")]
    pub version: u32,
    pub state: EngineSnapshot,
}

impl PersistedDocument {
    pub fn new(state: EngineSnapshot) -> Self {
        Self { version: CURRENT_DOCUMENT_VERSION, state }
    }
}

/// Write the document as plain (uncompressed) JSON. Used for the re-exec
/// hand-off, where the new process image must be able to read the state
/// back the instant it starts, and for `checkpoint::FsCheckpointWriter`'s
/// `.tmp` staging before compression.
pub fn write_plain(doc: &PersistedDocument, w: &mut impl Write) -> Result<(), StorageError> {
    serde_json::to_writer(w, doc)?;
    Ok(())
}

/// Read a plain JSON document, rejecting one from a newer, incompatible
/// schema version outright (spec.md §6's tolerances cover field-level
/// drift, not wholesale document reshaping).
pub fn read_plain(r: impl Read) -> Result<PersistedDocument, StorageError> {
    let doc: PersistedDocument = serde_json::from_reader(r)?;
    if doc.version > CURRENT_DOCUMENT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: doc.version,
            supported: CURRENT_DOCUMENT_VERSION,
        });
    }
    Ok(doc)
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
