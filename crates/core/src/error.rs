// SPDX-License-Identifier: MIT

//! Error types shared by the job repository and audio store collaborator
//! traits. Downstream crates (`scriberr-engine`, `scriberr-queue`) define
//! their own error enums for the RPC and scheduling concerns; these are
//! only the errors a `JobRepository`/`AudioStore` implementation can raise.

use crate::job::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job repository backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio path error for job {job}: {message}")]
    Io { job: JobId, message: String },
}
