// SPDX-License-Identifier: MIT

//! Filesystem `AudioStore`: input audio stays wherever the ingestion
//! collaborator put it; job output lands in a per-job directory under a
//! configured root.

use std::path::PathBuf;

use scriberr_core::{AudioStore, Job};

pub struct FileAudioStore {
    pub output_root: PathBuf,
}

impl FileAudioStore {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }
}

impl AudioStore for FileAudioStore {
    fn input_path(&self, job: &Job) -> PathBuf {
        job.audio_path.clone()
    }

    fn output_dir(&self, job: &Job) -> std::io::Result<PathBuf> {
        let dir = self.output_root.join(job.id.as_str());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
