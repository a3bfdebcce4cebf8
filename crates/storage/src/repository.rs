// SPDX-License-Identifier: MIT

//! A `JobRepository` backed by a single JSON file, written atomically
//! (`.tmp` + rename) on every mutation — the same durability primitive as
//! the teacher's `Snapshot::save`, applied per-write instead of on a
//! checkpoint cadence since this adapter has no WAL to truncate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use scriberr_core::{Job, JobId, JobRepository, JobStatus, RepositoryError};
use tracing::warn;

use crate::error::StorageError;

/// File-backed job backlog. One file holds the full job table as a flat JSON
/// array of jobs (not an object keyed by job id — see `write_atomically`);
/// reads are served from the in-memory copy, writes go to disk before
/// returning.
pub struct FileJobRepository {
    path: PathBuf,
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl FileJobRepository {
    /// Open (or create) the backlog file at `path`. A missing file starts
    /// empty; a corrupt one is moved aside to `.bak` so the daemon can still
    /// start rather than refusing to boot on a damaged backlog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let jobs: Vec<Job> = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt job backlog, moving aside and starting empty");
                    let _ = std::fs::rename(&path, path.with_extension("bak"));
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let jobs = jobs.into_iter().map(|j| (j.id.clone(), j)).collect();
        Ok(Self {
            path,
            jobs: Mutex::new(jobs),
        })
    }

    /// Seed a job directly, bypassing any ingestion path. Used by the
    /// operator control surface and by integration tests.
    pub fn insert(&self, job: Job) -> Result<(), StorageError> {
        {
            let mut jobs = self.jobs.lock();
            jobs.insert(job.id.clone(), job);
        }
        self.persist()
    }

    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().get(id).cloned()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let table: Vec<Job> = self.jobs.lock().values().cloned().collect();
        write_atomically(&self.path, &table)
    }
}

/// The on-disk shape is a flat array rather than a JSON object keyed by job
/// id, so `JobId`'s newtype `Serialize` impl never has to double as a map
/// key.
fn write_atomically(path: &Path, table: &[Job]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(table)?;
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl JobRepository for FileJobRepository {
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
        {
            let mut jobs = self.jobs.lock();
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
            job.status = status;
            if error_message.is_some() {
                job.error_message = error_message;
            }
        }
        self.persist()
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    async fn set_transcript(&self, id: &JobId, transcript: String) -> Result<(), RepositoryError> {
        {
            let mut jobs = self.jobs.lock();
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
            job.transcript = Some(transcript);
        }
        self.persist()
            .map_err(|e| RepositoryError::Backend(e.to_string()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use scriberr_core::JobParameters;
    use std::path::PathBuf;

    fn job(id: &str) -> Job {
        Job::new(JobId::new(id), PathBuf::from("/tmp/a.wav"), JobParameters::new())
    }

    #[tokio::test]
    async fn round_trips_through_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.json");

        let repo = FileJobRepository::open(&path).unwrap();
        repo.insert(job("j1")).unwrap();
        repo.set_status(&JobId::new("j1"), JobStatus::Processing, None)
            .await
            .unwrap();

        let reopened = FileJobRepository::open(&path).unwrap();
        let persisted = reopened.get(&JobId::new("j1")).await.unwrap();
        assert_eq!(persisted.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn set_status_preserves_error_message_when_none_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.json");
        let repo = FileJobRepository::open(&path).unwrap();
        let id = JobId::new("j1");
        repo.insert(job("j1")).unwrap();

        repo.set_status(&id, JobStatus::Failed, Some("boom".into()))
            .await
            .unwrap();
        repo.set_status(&id, JobStatus::Failed, None).await.unwrap();

        let persisted = repo.get(&id).await.unwrap();
        assert_eq!(persisted.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn list_ids_by_status_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.json");
        let repo = FileJobRepository::open(&path).unwrap();
        repo.insert(job("pending")).unwrap();
        let mut processing = job("processing");
        processing.status = JobStatus::Processing;
        repo.insert(processing).unwrap();

        let pending = repo.list_ids_by_status(JobStatus::Pending).await.unwrap();
        assert_eq!(pending, vec![JobId::new("pending")]);
    }

    #[test]
    fn opening_a_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let repo = FileJobRepository::open(&path).unwrap();
        assert!(repo.snapshot(&JobId::new("anything")).is_none());
    }

    #[test]
    fn opening_a_corrupt_file_moves_it_aside_and_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backlog.json");
        std::fs::write(&path, b"not json").unwrap();

        let repo = FileJobRepository::open(&path).unwrap();
        assert!(repo.snapshot(&JobId::new("anything")).is_none());
        assert!(path.with_extension("bak").exists());
    }
}
