// SPDX-License-Identifier: MIT

//! Job identifier, status, and parameter bundle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a transcription job.
    #[derive(Default)]
    pub struct JobId;
}

/// Status of a job as persisted by the job repository.
///
/// `Completed`, `Failed`, and `Cancelled` are terminal: once a job reaches
/// one of these it never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states are sticky: `Completed`, `Failed`, `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Opaque configuration bundle attached to a job.
///
/// Only `diarize` and `model` are interpreted by the core; everything else
/// (device hint, language, speaker bounds, VAD thresholds, batch size,
/// compute precision, ...) passes through untouched to the engine RPC calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobParameters(pub HashMap<String, String>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Whether diarization was requested. Defaults to `false` if absent or
    /// unparseable.
    pub fn diarize(&self) -> bool {
        self.get("diarize")
            .map(|v| matches!(v, "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    /// The requested model identifier, if the `model` key is present and
    /// non-empty.
    pub fn model(&self) -> Option<&str> {
        self.get("model").filter(|s| !s.is_empty())
    }
}

/// A transcription job, persisted by the job repository and read/written by
/// the core job-execution subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub audio_path: PathBuf,
    pub parameters: JobParameters,
    pub error_message: Option<String>,
    pub transcript: Option<String>,
}

impl Job {
    pub fn new(id: JobId, audio_path: PathBuf, parameters: JobParameters) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            audio_path,
            parameters,
            error_message: None,
            transcript: None,
        }
    }
}
