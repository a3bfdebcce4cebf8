// SPDX-License-Identifier: MIT

//! Message types for the engine RPC surface (spec §6).
//!
//! Field names are `camelCase` on the wire to match the contract exactly
//! ("wire compatibility must be bit-exact with existing engine binaries");
//! Rust-side fields stay `snake_case` and use `#[serde(rename = ...)]`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `(modelId, modelName)` pair identifying a specific model load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    #[serde(rename = "modelId")]
    pub model_id: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

/// Parameters for a `LoadModel` call. Fields left `None` are filled in by
/// the supervisor from its `EngineConfig` defaults before the RPC is sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "modelId")]
    pub model_id: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "intraOpThreads"
    )]
    pub intra_op_threads: Option<u32>,
}

impl ModelSpec {
    pub fn key(&self) -> ModelKey {
        ModelKey {
            model_id: self.model_id.clone(),
            model_name: self.model_name.clone(),
        }
    }
}

/// Health-probe response. Any successful response is treated as "ready";
/// the fields are informational.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub device: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListLoadedModelsResponse {
    pub models: Vec<ModelKey>,
}

/// Terminal and non-terminal job states as streamed by `StreamJobStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusMsg {
    pub state: JobState,
    #[serde(default)]
    pub progress: f32,
    #[serde(default, rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Acknowledgement for calls with no meaningful payload (`LoadModel`,
/// `UnloadModel`, `StartJob`, `StopJob`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub ok: bool,
}

/// One request on the engine RPC surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload")]
pub enum EngineRequest {
    GetEngineInfo,
    ListLoadedModels,
    LoadModel {
        spec: ModelSpec,
    },
    UnloadModel {
        #[serde(rename = "modelId")]
        model_id: String,
    },
    StartJob {
        #[serde(rename = "jobId")]
        job_id: String,
        #[serde(rename = "inputPath")]
        input_path: String,
        #[serde(rename = "outputDir")]
        output_dir: String,
        params: HashMap<String, String>,
    },
    StreamJobStatus {
        #[serde(rename = "jobId")]
        job_id: String,
    },
    StopJob {
        #[serde(rename = "jobId")]
        job_id: String,
    },
}

/// One response frame. `StreamJobStatus` produces a sequence of `JobStatus`
/// frames terminated either by a frame carrying a terminal `JobState` or by
/// an explicit `StreamEnd` (connection-level EOF is also treated as
/// stream end by the client).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum EngineResponse {
    EngineInfo(EngineInfo),
    LoadedModels(ListLoadedModelsResponse),
    Ack(Ack),
    JobStatus(JobStatusMsg),
    StreamEnd,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_spec_field_names_are_camel_case_on_wire() {
        let spec = ModelSpec {
            model_id: "whisper".into(),
            model_name: "small".into(),
            providers: Some(vec!["cpu".into()]),
            intra_op_threads: Some(4),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["modelId"], "whisper");
        assert_eq!(json["modelName"], "small");
        assert_eq!(json["intraOpThreads"], 4);
    }

    #[test]
    fn start_job_request_round_trips() {
        let req = EngineRequest::StartJob {
            job_id: "j1".into(),
            input_path: "/tmp/a.wav".into(),
            output_dir: "/tmp/out".into(),
            params: HashMap::new(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jobId\":\"j1\""));
        let back: EngineRequest = serde_json::from_str(&json).unwrap();
        match back {
            EngineRequest::StartJob { job_id, .. } => assert_eq!(job_id, "j1"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn job_state_terminal() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }
}
