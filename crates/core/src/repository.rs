// SPDX-License-Identifier: MIT

//! Collaborator traits the job-execution core consumes but does not own.
//!
//! Per the subsystem's scope, persistence and audio I/O are external
//! concerns: ingestion endpoints, credential storage, and the actual
//! on-disk/ORM layout live outside this workspace's core crates. A
//! `scriberr-storage` crate provides one concrete `JobRepository`, used by
//! the daemon and by these crates' own tests.

use crate::error::RepositoryError;
use crate::job::{Job, JobId, JobStatus};
use async_trait::async_trait;
use std::path::PathBuf;

/// Persistence boundary for jobs. The task queue reads pending/processing
/// jobs at startup and writes status transitions as jobs progress; it never
/// assumes anything about how a `JobRepository` stores data.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError>;

    /// Write a status transition. `error_message` is set on `Failed` and
    /// `Cancelled` transitions, and is otherwise left untouched (a
    /// transition to `Processing` does not clear a previous
    /// `error_message` - there is none to clear, since `Processing` only
    /// follows `Pending`).
    async fn set_status(
        &self,
        id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError>;

    async fn set_transcript(&self, id: &JobId, transcript: String) -> Result<(), RepositoryError>;

    /// All job ids currently persisted in `status`. Used by startup
    /// recovery (`Pending` and `Processing`) and is not expected to be
    /// called on the hot path.
    async fn list_ids_by_status(&self, status: JobStatus) -> Result<Vec<JobId>, RepositoryError>;
}

/// Audio input/output path resolution, kept separate from `JobRepository`
/// since a deployment may store audio on a different volume (or object
/// store) than job metadata.
pub trait AudioStore: Send + Sync {
    /// Absolute path to the job's input audio. Mirrors `Job::audio_path`
    /// today but is a distinct seam so a future adapter (remote fetch,
    /// object storage) doesn't need to change `Job`.
    fn input_path(&self, job: &Job) -> PathBuf;

    /// Directory the engine should write job output into. Created if
    /// missing.
    fn output_dir(&self, job: &Job) -> std::io::Result<PathBuf>;
}

/// Forward both collaborator traits through an `Arc`, so the same shared
/// instance can be handed to the Job Processor and to the Task Queue
/// without either owning it outright.
#[async_trait]
impl<T: JobRepository + ?Sized> JobRepository for std::sync::Arc<T> {
    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError> {
        (**self).get(id).await
    }

    async fn set_status(
        &self,
        id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        (**self).set_status(id, status, error_message).await
    }

    async fn set_transcript(&self, id: &JobId, transcript: String) -> Result<(), RepositoryError> {
        (**self).set_transcript(id, transcript).await
    }

    async fn list_ids_by_status(&self, status: JobStatus) -> Result<Vec<JobId>, RepositoryError> {
        (**self).list_ids_by_status(status).await
    }
}

impl<T: AudioStore + ?Sized> AudioStore for std::sync::Arc<T> {
    fn input_path(&self, job: &Job) -> PathBuf {
        (**self).input_path(job)
    }

    fn output_dir(&self, job: &Job) -> std::io::Result<PathBuf> {
        (**self).output_dir(job)
    }
}
