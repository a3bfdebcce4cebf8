// SPDX-License-Identifier: MIT

//! Errors a file-backed `JobRepository` can raise on top of the IO errors
//! `scriberr_core::RepositoryError::Backend` already carries as a string.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
