// SPDX-License-Identifier: MIT

//! The Job Processor: translates one queued job into activity against the
//! ASR and (optionally) diarization engine supervisors.

use std::collections::HashMap;

use scriberr_core::{AudioStore, Job, JobRepository};
use scriberr_wire::ModelSpec;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::EngineError;
use crate::supervisor::EngineSupervisor;

const MIN_SPEAKER_COUNT: u32 = 1;
const MAX_SPEAKER_COUNT: u32 = 20;

/// Engines a [`JobProcessor`] addresses, grouped so callers can construct one
/// processor per daemon and reuse it across every dequeued job.
pub struct JobProcessor<R, A> {
    repository: R,
    audio_store: A,
    asr: std::sync::Arc<EngineSupervisor>,
    diarization: std::sync::Arc<EngineSupervisor>,
}

impl<R, A> JobProcessor<R, A>
where
    R: JobRepository,
    A: AudioStore,
{
    pub fn new(
        repository: R,
        audio_store: A,
        asr: std::sync::Arc<EngineSupervisor>,
        diarization: std::sync::Arc<EngineSupervisor>,
    ) -> Self {
        Self {
            repository,
            audio_store,
            asr,
            diarization,
        }
    }

    /// Run one job to completion (or failure / cancellation).
    ///
    /// `register_process` is called as soon as a subprocess handle is
    /// associated with this job, so the queue can wire it into the per-job
    /// registry for a hard kill. Because engines are long-lived and shared,
    /// the registered handle is the engine subprocess currently serving this
    /// `run_job` call — killing it aborts whatever else that engine happened
    /// to be running, which is fine since each engine serves one job at a
    /// time (§4.2).
    pub async fn process_job(
        &self,
        job_id: &scriberr_core::JobId,
        cancel: CancellationToken,
        mut register_process: impl FnMut(u32),
    ) -> Result<String, EngineError> {
        let job = self.repository.get(job_id).await?;
        let model = validate_parameters(&job.parameters)?;

        let input_path = self.audio_store.input_path(&job);
        let output_dir = self.audio_store.output_dir(&job)?;
        let input_path = input_path.to_string_lossy().into_owned();
        let output_dir = output_dir.to_string_lossy().into_owned();

        let asr_status = self
            .run_on(
                &self.asr,
                &job,
                model,
                job_id.as_str(),
                &input_path,
                &output_dir,
                cancel.clone(),
                &mut register_process,
            )
            .await?;

        if !job.parameters.diarize() {
            return Ok(asr_status.error_message.unwrap_or_default());
        }

        info!(job_id = %job_id, "diarization requested, running diarization pass");
        let diar_status = self
            .run_on(
                &self.diarization,
                &job,
                model,
                job_id.as_str(),
                &input_path,
                &output_dir,
                cancel,
                &mut register_process,
            )
            .await?;

        Ok(compose_transcript(
            asr_status.error_message,
            diar_status.error_message,
        ))
    }

    async fn run_on(
        &self,
        supervisor: &EngineSupervisor,
        job: &Job,
        model: &str,
        job_id: &str,
        input_path: &str,
        output_dir: &str,
        cancel: CancellationToken,
        register_process: &mut impl FnMut(u32),
    ) -> Result<scriberr_wire::JobStatusMsg, EngineError> {
        supervisor.ensure_ready().await?;

        supervisor
            .load_model(ModelSpec {
                model_id: model.to_string(),
                model_name: model.to_string(),
                providers: None,
                intra_op_threads: None,
            })
            .await?;

        if let Some(pid) = supervisor.current_pid() {
            register_process(pid);
        }

        let params: HashMap<String, String> = job.parameters.0.clone();
        let status = supervisor
            .run_job(job_id, input_path, output_dir, params, cancel)
            .await?;

        match status.state {
            scriberr_wire::JobState::Completed => Ok(status),
            scriberr_wire::JobState::Cancelled => Err(EngineError::Cancelled),
            _ => Err(EngineError::EngineSide(
                status
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("engine finished in state {:?}", status.state)),
            )),
        }
    }
}

/// Validates the interpreted keys of a job's parameter bundle, returning the
/// resolved model id on success. `model` is required; `speaker_count`, if
/// present, must parse as an integer in `MIN_SPEAKER_COUNT..=MAX_SPEAKER_COUNT`.
fn validate_parameters(params: &scriberr_core::JobParameters) -> Result<&str, EngineError> {
    let model = params
        .model()
        .ok_or_else(|| EngineError::InvalidParameters("missing required `model` key".into()))?;

    if let Some(raw) = params.get("speaker_count") {
        let count: u32 = raw.parse().map_err(|_| {
            EngineError::InvalidParameters(format!("speaker_count {raw:?} is not an integer"))
        })?;
        if !(MIN_SPEAKER_COUNT..=MAX_SPEAKER_COUNT).contains(&count) {
            return Err(EngineError::InvalidParameters(format!(
                "speaker_count {count} out of bounds {MIN_SPEAKER_COUNT}..={MAX_SPEAKER_COUNT}"
            )));
        }
    }

    Ok(model)
}

/// `JobStatusMsg` doesn't carry a transcript payload on the wire today (spec
/// §6 only defines state/progress/error); the transcript text is whatever the
/// engine chose to write into `output_dir`, which is outside this crate's
/// concern. What we retain here is a human-readable summary of what ran.
fn compose_transcript(asr_message: Option<String>, diar_message: Option<String>) -> String {
    match (asr_message, diar_message) {
        (None, None) => String::new(),
        (Some(a), None) => a,
        (None, Some(d)) => d,
        (Some(a), Some(d)) => format!("{a}\n{d}"),
    }
}
