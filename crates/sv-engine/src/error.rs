// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors the engine surfaces to RPC callers and the main loop.

use sv_core::{ClassId, JobId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown job class: {0}")]
    UnknownClass(ClassId),

    #[error("unknown job instance: {0}")]
    UnknownJob(JobId),

    #[error("instance {0} already started")]
    AlreadyStarted(JobId),

    #[error("instance {0} already stopped")]
    AlreadyStopped(JobId),

    #[error("config error: {0}")]
    Config(#[from] sv_config::ConfigError),
}
