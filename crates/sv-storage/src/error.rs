// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from persisting and loading the re-exec/checkpoint document.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compression error: {0}")]
    Compress(String),

    #[error("snapshot schema version {found} is newer than this build ({supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("checkpoint already in progress")]
    InProgress,
}
