// SPDX-License-Identifier: MIT

//! Daemon-level errors: configuration resolution, PID locking, socket
//! binding. Per-job failures never surface here — those are Task Queue
//! concerns, written straight to the job repository.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine state directory (set SCRIBERR_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("failed to acquire PID lock: another scriberrd may already be running")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind control socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] scriberr_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] scriberr_queue::QueueError),
}
