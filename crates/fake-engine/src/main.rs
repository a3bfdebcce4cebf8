// SPDX-License-Identifier: MIT

// This binary only exists as a test fixture; a misconfigured environment
// should fail loudly rather than propagate a swallowed error.
#![allow(clippy::expect_used)]

//! Out-of-process test fixture standing in for a real ASR/diarization
//! engine binary. Used by integration tests that need a genuine subprocess
//! to exercise `EnsureReady`'s launch/readiness-poll path and the Process
//! Tree Killer's real process-group signalling.
//!
//! Socket path is read from whichever of `ASR_ENGINE_SOCKET` /
//! `DIAR_ENGINE_SOCKET` is set (mirroring how `EngineSupervisor` passes it
//! down). Per-job behavior is driven by two parameters a test passes in
//! `StartJob`'s `params` map:
//! - `_test_plan`: comma-separated `JobState` names to stream, e.g.
//!   `"RUNNING,RUNNING,COMPLETED"`. Defaults to `"COMPLETED"`.
//! - `_test_plan` of literally `"FOREVER"` streams `RUNNING` every 50ms
//!   until `StopJob` is called for that job id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use scriberr_wire::{
    bind, serve, EngineBehavior, EngineInfo, EngineResponse, JobState, JobStatusMsg, ModelKey,
    ModelSpec,
};

#[derive(Default)]
struct FakeEngine {
    loaded: Mutex<Vec<ModelKey>>,
    stopped: Mutex<std::collections::HashSet<String>>,
    plans: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl EngineBehavior for FakeEngine {
    async fn engine_info(&self) -> EngineResponse {
        EngineResponse::EngineInfo(EngineInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device: "cpu".to_string(),
        })
    }

    async fn loaded_models(&self) -> Vec<ModelKey> {
        self.loaded.lock().clone()
    }

    async fn load_model(&self, spec: &ModelSpec) -> Result<(), String> {
        self.loaded.lock().push(spec.key());
        Ok(())
    }

    async fn unload_model(&self, model_id: &str) -> Result<(), String> {
        self.loaded.lock().retain(|k| k.model_id != model_id);
        Ok(())
    }

    async fn start_job(
        &self,
        job_id: &str,
        _input_path: &str,
        _output_dir: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), String> {
        let plan = params
            .get("_test_plan")
            .cloned()
            .unwrap_or_else(|| "COMPLETED".to_string());
        self.plans.lock().insert(job_id.to_string(), plan);
        self.stopped.lock().remove(job_id);
        Ok(())
    }

    async fn job_statuses(&self, job_id: &str, tx: mpsc::Sender<JobStatusMsg>) {
        let plan = self
            .plans
            .lock()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| "COMPLETED".to_string());

        if plan == "FOREVER" {
            loop {
                if self.stopped.lock().contains(job_id) {
                    return;
                }
                let msg = JobStatusMsg {
                    state: JobState::Running,
                    progress: 0.5,
                    error_message: None,
                };
                if tx.send(msg).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }

        for (i, name) in plan.split(',').enumerate() {
            let state = parse_state(name.trim());
            let msg = JobStatusMsg {
                state,
                progress: (i + 1) as f32 / plan.split(',').count() as f32,
                error_message: None,
            };
            if tx.send(msg).await.is_err() {
                return;
            }
        }
    }

    async fn stop_job(&self, job_id: &str) {
        self.stopped.lock().insert(job_id.to_string());
    }
}

fn parse_state(name: &str) -> JobState {
    match name {
        "QUEUED" => JobState::Queued,
        "RUNNING" => JobState::Running,
        "FAILED" => JobState::Failed,
        "CANCELLED" => JobState::Cancelled,
        _ => JobState::Completed,
    }
}

#[tokio::main]
async fn main() {
    let socket_path = std::env::var("ASR_ENGINE_SOCKET")
        .or_else(|_| std::env::var("DIAR_ENGINE_SOCKET"))
        .expect("ASR_ENGINE_SOCKET or DIAR_ENGINE_SOCKET must be set");

    let listener = bind(std::path::Path::new(&socket_path))
        .await
        .expect("failed to bind engine socket");

    let behavior: Arc<dyn EngineBehavior> = Arc::new(FakeEngine::default());
    serve(listener, behavior).await;
}
