// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the Configuration Manager.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path}: missing required 'exec' or 'script' for process slot")]
    MissingCommand { path: PathBuf },

    #[error("{path}: {message}")]
    Semantic { path: PathBuf, message: String },

    #[error("unknown config source {0}")]
    UnknownSource(sv_core::SourceId),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: failed to install filesystem watch: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl ConfigError {
    /// Failures that leave the source retryable rather than fatal, per
    /// the "missing source root is recoverable" clause.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::Watch { .. })
    }
}
