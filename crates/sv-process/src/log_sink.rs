// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where a process slot's stdout/stderr go, grounded on the pack's
//! per-job-kind logger split (one sink per job, shared across its slots).

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use sv_core::ProcessKind;

/// Supplies the `Stdio` handles a spawned process slot's stdout/stderr are
/// wired to. A real daemon logs every slot of a job to its own rotating
/// file; tests substitute an in-memory sink that never touches the
/// filesystem.
pub trait LogSink: Send + Sync {
    fn stdout(&self, job_name: &str, kind: ProcessKind) -> io::Result<Stdio>;
    fn stderr(&self, job_name: &str, kind: ProcessKind) -> io::Result<Stdio>;
}

/// One append-only file per job; every slot's output lands in it, matching
/// `console=log`'s "all slots share the job's single log" semantics.
pub struct FileLogSink {
    root: PathBuf,
}

impl FileLogSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, job_name: &str) -> PathBuf {
        self.root.join(format!("{job_name}.log"))
    }

    fn open(&self, job_name: &str) -> io::Result<std::fs::File> {
        std::fs::create_dir_all(&self.root)?;
        OpenOptions::new().create(true).append(true).open(self.path(job_name))
    }
}

impl LogSink for FileLogSink {
    fn stdout(&self, job_name: &str, _kind: ProcessKind) -> io::Result<Stdio> {
        Ok(Stdio::from(self.open(job_name)?))
    }

    fn stderr(&self, job_name: &str, _kind: ProcessKind) -> io::Result<Stdio> {
        Ok(Stdio::from(self.open(job_name)?))
    }
}

/// Discards everything — `console=none`, the default unless a class asks
/// for output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn stdout(&self, _job_name: &str, _kind: ProcessKind) -> io::Result<Stdio> {
        Ok(Stdio::null())
    }

    fn stderr(&self, _job_name: &str, _kind: ProcessKind) -> io::Result<Stdio> {
        Ok(Stdio::null())
    }
}

/// Records every slot opened for output, for tests that assert on spawn
/// behavior without touching the filesystem.
#[derive(Default)]
pub struct FakeLogSink {
    pub opened: Mutex<Vec<(String, ProcessKind)>>,
}

impl LogSink for FakeLogSink {
    fn stdout(&self, job_name: &str, kind: ProcessKind) -> io::Result<Stdio> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((job_name.to_string(), kind));
        Ok(Stdio::null())
    }

    fn stderr(&self, _job_name: &str, _kind: ProcessKind) -> io::Result<Stdio> {
        Ok(Stdio::null())
    }
}

#[cfg(test)]
#[path = "log_sink_tests.rs"]
mod tests;
