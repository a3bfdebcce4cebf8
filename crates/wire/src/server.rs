// SPDX-License-Identifier: MIT

//! A minimal server loop for the engine RPC surface, shared by the
//! in-process fake used in unit tests and by the out-of-process
//! `fake-engine` test fixture binary that stands in for a real ASR/
//! diarization engine in integration tests.

use crate::frame::{self, ProtocolError};
use crate::messages::{Ack, EngineRequest, EngineResponse, JobStatusMsg, ListLoadedModelsResponse, ModelKey};
use async_trait::async_trait;
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

/// Engine-side behavior. A real engine binary implements this against its
/// actual ASR/diarization backend; test fixtures implement it against a
/// scripted plan.
#[async_trait]
pub trait EngineBehavior: Send + Sync {
    async fn engine_info(&self) -> EngineResponse;
    async fn loaded_models(&self) -> Vec<ModelKey>;
    async fn load_model(&self, spec: &crate::messages::ModelSpec) -> Result<(), String>;
    async fn unload_model(&self, model_id: &str) -> Result<(), String>;
    async fn start_job(
        &self,
        job_id: &str,
        input_path: &str,
        output_dir: &str,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<(), String>;
    /// Push zero or more statuses for `job_id` onto `tx`, in order, then
    /// return. Returning (or dropping `tx`) ends the stream with
    /// `StreamEnd`. Takes `tx` by value, not a `&self` poll, so an
    /// implementation can block indefinitely between sends (e.g. "stream
    /// RUNNING until stopped") without the server needing a separate
    /// polling loop.
    async fn job_statuses(&self, job_id: &str, tx: mpsc::Sender<JobStatusMsg>);
    async fn stop_job(&self, job_id: &str);
}

/// Bind a listener at `socket_path`, removing any stale socket file first.
pub async fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    let _ = std::fs::remove_file(socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(socket_path)
}

/// Accept connections forever (or until the listener errors), handling each
/// on its own task. Connections are independent at the transport level —
/// e.g. a `StopJob` call arrives on its own short-lived connection while a
/// `StreamJobStatus` call is still in flight on another. Spec §4.2's
/// "at most one job per engine" single-tenant rule is enforced by the
/// `EngineSupervisor`'s job mutex on the client side, not by serializing
/// connections here.
pub async fn serve(listener: UnixListener, behavior: std::sync::Arc<dyn EngineBehavior>) {
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(pair) => pair,
            Err(_) => return,
        };
        let behavior = behavior.clone();
        tokio::spawn(async move {
            let _ = serve_connection(stream, behavior.as_ref()).await;
        });
    }
}

async fn serve_connection(
    mut stream: UnixStream,
    behavior: &(dyn EngineBehavior),
) -> Result<(), ProtocolError> {
    loop {
        let request: EngineRequest = match frame::recv(&mut stream).await {
            Ok(req) => req,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        match request {
            EngineRequest::GetEngineInfo => {
                frame::send(&mut stream, &behavior.engine_info().await).await?;
            }
            EngineRequest::ListLoadedModels => {
                let models = behavior.loaded_models().await;
                frame::send(
                    &mut stream,
                    &EngineResponse::LoadedModels(ListLoadedModelsResponse { models }),
                )
                .await?;
            }
            EngineRequest::LoadModel { spec } => {
                let resp = match behavior.load_model(&spec).await {
                    Ok(()) => EngineResponse::Ack(Ack { ok: true }),
                    Err(message) => EngineResponse::Error { message },
                };
                frame::send(&mut stream, &resp).await?;
            }
            EngineRequest::UnloadModel { model_id } => {
                let resp = match behavior.unload_model(&model_id).await {
                    Ok(()) => EngineResponse::Ack(Ack { ok: true }),
                    Err(message) => EngineResponse::Error { message },
                };
                frame::send(&mut stream, &resp).await?;
            }
            EngineRequest::StartJob {
                job_id,
                input_path,
                output_dir,
                params,
            } => {
                let resp = match behavior.start_job(&job_id, &input_path, &output_dir, &params).await {
                    Ok(()) => EngineResponse::Ack(Ack { ok: true }),
                    Err(message) => EngineResponse::Error { message },
                };
                frame::send(&mut stream, &resp).await?;
            }
            EngineRequest::StreamJobStatus { job_id } => {
                let (tx, mut rx) = mpsc::channel(32);
                let mut produce = behavior.job_statuses(&job_id, tx);
                let mut producing = true;
                loop {
                    tokio::select! {
                        status = rx.recv() => {
                            match status {
                                Some(status) => {
                                    frame::send(&mut stream, &EngineResponse::JobStatus(status)).await?;
                                }
                                None => break,
                            }
                        }
                        _ = &mut produce, if producing => {
                            producing = false;
                        }
                    }
                }
                frame::send(&mut stream, &EngineResponse::StreamEnd).await?;
            }
            EngineRequest::StopJob { job_id } => {
                behavior.stop_job(&job_id).await;
                frame::send(&mut stream, &EngineResponse::Ack(Ack { ok: true })).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EngineClient;
    use crate::messages::{EngineInfo, ModelSpec};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct ScriptedBehavior {
        plan: Vec<JobStatusMsg>,
        stopped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EngineBehavior for ScriptedBehavior {
        async fn engine_info(&self) -> EngineResponse {
            EngineResponse::EngineInfo(EngineInfo::default())
        }

        async fn loaded_models(&self) -> Vec<ModelKey> {
            vec![]
        }

        async fn load_model(&self, _spec: &ModelSpec) -> Result<(), String> {
            Ok(())
        }

        async fn unload_model(&self, _model_id: &str) -> Result<(), String> {
            Ok(())
        }

        async fn start_job(
            &self,
            _job_id: &str,
            _input_path: &str,
            _output_dir: &str,
            _params: &std::collections::HashMap<String, String>,
        ) -> Result<(), String> {
            Ok(())
        }

        async fn job_statuses(&self, _job_id: &str, tx: mpsc::Sender<JobStatusMsg>) {
            for status in &self.plan {
                if tx.send(status.clone()).await.is_err() {
                    return;
                }
            }
        }

        async fn stop_job(&self, _job_id: &str) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn round_trips_start_job_and_status_stream() {
        use crate::messages::JobState;

        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("engine.sock");
        let listener = bind(&socket_path).await.unwrap();

        let stopped = Arc::new(AtomicBool::new(false));
        let behavior = Arc::new(ScriptedBehavior {
            plan: vec![
                JobStatusMsg {
                    state: JobState::Running,
                    progress: 0.5,
                    error_message: None,
                },
                JobStatusMsg {
                    state: JobState::Completed,
                    progress: 1.0,
                    error_message: None,
                },
            ],
            stopped: stopped.clone(),
        });

        let server_behavior: Arc<dyn EngineBehavior> = behavior.clone();
        tokio::spawn(async move {
            serve(listener, server_behavior).await;
        });

        let mut client = EngineClient::connect(&socket_path).await.unwrap();
        let resp = client.call(&EngineRequest::GetEngineInfo).await.unwrap();
        assert!(matches!(resp, EngineResponse::EngineInfo(_)));

        client.start_stream("job-1").await.unwrap();
        let first = client.recv_status().await.unwrap().unwrap();
        assert_eq!(first.state, JobState::Running);
        let second = client.recv_status().await.unwrap().unwrap();
        assert_eq!(second.state, JobState::Completed);
        assert!(client.recv_status().await.unwrap().is_none());

        crate::client::stop_job(&socket_path, "job-1").await.unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }
}
