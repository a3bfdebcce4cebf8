// SPDX-License-Identifier: MIT

//! In-memory fakes for `JobRepository`/`AudioStore`, used by downstream
//! crates' test suites. Mirrors the teacher's `agent::fake` fake-adapter
//! pattern: a real trait implementation backed by a `Mutex<HashMap<...>>`
//! instead of I/O, so tests can assert on persisted state transitions
//! without a filesystem.

use crate::error::RepositoryError;
use crate::job::{Job, JobId, JobStatus};
use crate::repository::{AudioStore, JobRepository};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

/// In-memory `JobRepository` for unit and integration tests.
#[derive(Default)]
pub struct FakeJobRepository {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl FakeJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job directly, bypassing any ingestion path.
    pub fn insert(&self, job: Job) {
        self.jobs.lock().insert(job.id.clone(), job);
    }

    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().get(id).cloned()
    }
}

#[async_trait]
impl JobRepository for FakeJobRepository {
    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError> {
        self.jobs
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    async fn set_status(
        &self,
        id: &JobId,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        job.status = status;
        if error_message.is_some() {
            job.error_message = error_message;
        }
        Ok(())
    }

    async fn set_transcript(&self, id: &JobId, transcript: String) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        job.transcript = Some(transcript);
        Ok(())
    }

    async fn list_ids_by_status(&self, status: JobStatus) -> Result<Vec<JobId>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .values()
            .filter(|j| j.status == status)
            .map(|j| j.id.clone())
            .collect())
    }
}

/// `AudioStore` that resolves output directories under a temp-backed root.
pub struct FakeAudioStore {
    pub output_root: PathBuf,
}

impl AudioStore for FakeAudioStore {
    fn input_path(&self, job: &Job) -> PathBuf {
        job.audio_path.clone()
    }

    fn output_dir(&self, job: &Job) -> std::io::Result<PathBuf> {
        let dir = self.output_root.join(job.id.as_str());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
