// SPDX-License-Identifier: MIT

//! Error taxonomy for the task queue's public operations.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is at capacity")]
    QueueFull,
    #[error("queue is shutting down")]
    QueueShuttingDown,
    #[error("job is not running")]
    JobNotRunning,
}
