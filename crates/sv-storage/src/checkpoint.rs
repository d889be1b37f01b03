// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background, zstd-compressed snapshot writer for crash recovery: a
//! periodic on-disk counterpart to the re-exec hand-off, so a crashed
//! (not re-exec'd) daemon can still resume close to where it left off.
//!
//! Durability order matters: the compressed snapshot must be fsync'd and
//! its rename made durable (directory fsync) before the caller is told
//! the checkpoint succeeded.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::document::{write_plain, PersistedDocument};
use crate::error::StorageError;
use sv_engine::EngineSnapshot;

/// Abstracts the checkpoint's filesystem operations so tests can assert on
/// call order and inject failures without touching a real disk.
pub trait CheckpointWriter: Send + Sync + 'static {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), StorageError>;
    fn fsync_file(&self, path: &Path) -> Result<(), StorageError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;
    fn fsync_dir(&self, path: &Path) -> Result<(), StorageError>;
}

#[derive(Clone, Default)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), StorageError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn fsync_dir(&self, path: &Path) -> Result<(), StorageError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }
}

/// Result of a completed checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub size_bytes: u64,
}

/// A checkpoint running on a background thread. Drop it to detach, or call
/// [`CheckpointHandle::wait`] to block until the snapshot is durable.
pub struct CheckpointHandle {
    receiver: mpsc::Receiver<Result<CheckpointResult, StorageError>>,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl CheckpointHandle {
    pub fn wait(self) -> Result<CheckpointResult, StorageError> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(StorageError::Compress("checkpoint thread panicked".into())))
    }
}

/// Periodic snapshot writer: one in flight at a time, per
/// `sv-daemon`'s main loop.
pub struct Checkpointer<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Checkpointer<FsCheckpointWriter> {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, snapshot_path)
    }
}

impl<W: CheckpointWriter + Clone> Checkpointer<W> {
    pub fn with_writer(writer: W, snapshot_path: PathBuf) -> Self {
        Self { writer, snapshot_path, compression_level: 3 }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Clone `snapshot` and write it on a background thread.
    pub fn start(&self, snapshot: EngineSnapshot) -> CheckpointHandle {
        let writer = self.writer.clone();
        let snapshot_path = self.snapshot_path.clone();
        let compression_level = self.compression_level;

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = checkpoint_blocking(&writer, snapshot, &snapshot_path, compression_level);
            if let Err(err) = &result {
                tracing::warn!(%err, path = %snapshot_path.display(), "checkpoint failed");
            }
            let _ = tx.send(result);
        });

        CheckpointHandle { receiver: rx, handle }
    }

    /// Synchronous checkpoint, for a clean-shutdown path that can't wait
    /// on a detached thread.
    pub fn checkpoint_sync(&self, snapshot: EngineSnapshot) -> Result<CheckpointResult, StorageError> {
        checkpoint_blocking(&self.writer, snapshot, &self.snapshot_path, self.compression_level)
    }
}

fn checkpoint_blocking<W: CheckpointWriter>(
    writer: &W,
    snapshot: EngineSnapshot,
    snapshot_path: &Path,
    compression_level: i32,
) -> Result<CheckpointResult, StorageError> {
    let tmp_path = snapshot_path.with_extension("tmp");
    let doc = PersistedDocument::new(snapshot);

    let mut plain = Vec::new();
    write_plain(&doc, &mut plain)?;
    let compressed = zstd::encode_all(plain.as_slice(), compression_level)
        .map_err(|e| StorageError::Compress(e.to_string()))?;

    writer.write_tmp(&tmp_path, &compressed)?;
    writer.fsync_file(&tmp_path)?;
    writer.rename(&tmp_path, snapshot_path)?;
    if let Some(parent) = snapshot_path.parent() {
        writer.fsync_dir(parent)?;
    }

    let result = CheckpointResult { size_bytes: compressed.len() as u64 };
    tracing::debug!(size_bytes = result.size_bytes, path = %snapshot_path.display(), "checkpoint written");
    Ok(result)
}

/// Load a zstd-compressed on-disk snapshot, if one exists.
pub fn load_snapshot(path: &Path) -> Result<Option<PersistedDocument>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let decoder = zstd::stream::read::Decoder::new(file)
        .map_err(|e| StorageError::Compress(e.to_string()))?;
    Ok(Some(crate::document::read_plain(decoder)?))
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
