// SPDX-License-Identifier: MIT

//! Error types for the engine supervisor and job processor.

use scriberr_core::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine did not become ready within {timeout_ms} ms")]
    EngineNotReady { timeout_ms: u64 },

    #[error("failed to launch engine subprocess: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine RPC failed: {0}")]
    Rpc(#[from] scriberr_wire::ProtocolError),

    #[error("engine returned an error: {0}")]
    EngineSide(String),

    #[error("invalid job parameters: {0}")]
    InvalidParameters(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("job repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}
