// SPDX-License-Identifier: MIT

//! The Engine Supervisor: owns one engine subprocess and the single RPC
//! channel multiplexed onto it.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use scriberr_wire::{
    EngineClient, EngineRequest, EngineResponse, JobStatusMsg, ModelKey, ModelSpec,
};

use crate::config::EngineConfig;
use crate::error::EngineError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    Starting,
    Ready,
}

struct Inner {
    state: State,
    child: Option<tokio::process::Child>,
    pid: Option<u32>,
}

/// Owns one ASR or diarization engine subprocess. Shared across the worker
/// pool: `run_job` serializes on [`Self::job_lock`] so at most one job runs
/// against this engine at a time, matching spec's "lock the engine, not the
/// queue".
pub struct EngineSupervisor {
    config: EngineConfig,
    inner: Arc<Mutex<Inner>>,
    ensure_ready_lock: tokio::sync::Mutex<()>,
    job_lock: tokio::sync::Mutex<()>,
}

impl EngineSupervisor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: State::NotStarted,
                child: None,
                pid: None,
            })),
            ensure_ready_lock: tokio::sync::Mutex::new(()),
            job_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// PID of the current subprocess, if one is running. Used by the Job
    /// Processor's `registerProcess` callback so the queue can hard-kill it.
    ///
    /// Reads the PID captured at spawn time, not `inner.child`: the reaper
    /// task takes `child` out of `Inner` so it can `.wait()` on it without
    /// holding the lock across the await, so `child` is `None` for the
    /// entire lifetime of a running engine.
    pub fn current_pid(&self) -> Option<u32> {
        self.inner.lock().pid
    }

    /// Guarantee a live, reachable engine subprocess.
    pub async fn ensure_ready(&self) -> Result<(), EngineError> {
        let _permit = self.ensure_ready_lock.lock().await;

        if self.inner.lock().state == State::Ready && self.probe().await {
            return Ok(());
        }
        {
            let mut inner = self.inner.lock();
            if inner.state == State::Ready {
                inner.state = State::NotStarted;
            }
        }

        if self.inner.lock().child.is_none() {
            self.spawn_subprocess()?;
        }

        let deadline = tokio::time::Instant::now() + self.config.start_timeout;
        loop {
            if self.probe().await {
                self.inner.lock().state = State::Ready;
                info!(role = ?self.config.role, "engine ready");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::EngineNotReady {
                    timeout_ms: self.config.start_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn spawn_subprocess(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();

        if let Some(parent) = self.config.socket_path.parent() {
            let _ = std::fs::create_dir_all(parent);
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = std::fs::metadata(parent) {
                    let mut perms = meta.permissions();
                    perms.set_mode(0o755);
                    let _ = std::fs::set_permissions(parent, perms);
                }
            }
        }

        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| EngineError::Spawn(std::io::Error::other("empty engine command")))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(
                format!("{}_ENGINE_SOCKET", self.config.role.env_prefix()),
                &self.config.socket_path,
            )
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(EngineError::Spawn)?;
        let pid = child.id();
        inner.child = Some(child);
        inner.pid = pid;
        inner.state = State::Starting;
        drop(inner);

        let inner_for_waiter = self.inner.clone();
        let role = self.config.role;
        tokio::spawn(async move {
            let status = {
                let mut inner = inner_for_waiter.lock();
                inner.child.take()
            };
            if let Some(mut child) = status {
                let result = child.wait().await;
                let mut inner = inner_for_waiter.lock();
                inner.state = State::NotStarted;
                inner.child = None;
                inner.pid = None;
                match result {
                    Ok(status) => warn!(?role, pid, %status, "engine subprocess exited"),
                    Err(e) => warn!(?role, pid, error = %e, "failed to wait on engine subprocess"),
                }
            }
        });

        Ok(())
    }

    /// Health probe: any successful `GetEngineInfo` reply means ready.
    async fn probe(&self) -> bool {
        let result = tokio::time::timeout(PROBE_TIMEOUT, async {
            let mut client = EngineClient::connect(&self.config.socket_path).await?;
            client.call(&EngineRequest::GetEngineInfo).await
        })
        .await;

        matches!(result, Ok(Ok(EngineResponse::EngineInfo(_))))
    }

    /// Idempotent model residency: queries the engine's loaded-model list
    /// before issuing a load RPC, rather than trusting a local cache that
    /// would go stale if the engine evicted a model on its own.
    pub async fn load_model(&self, mut spec: ModelSpec) -> Result<(), EngineError> {
        self.ensure_ready().await?;

        if spec.providers.is_none() && !self.config.providers.is_empty() {
            spec.providers = Some(self.config.providers.clone());
        }
        if spec.intra_op_threads.is_none() {
            spec.intra_op_threads = self.config.intra_op_threads;
        }

        let key = spec.key();
        if self.loaded_models().await?.contains(&key) {
            return Ok(());
        }

        let mut client = EngineClient::connect(&self.config.socket_path).await?;
        let resp = client.call(&EngineRequest::LoadModel { spec }).await?;
        match resp {
            EngineResponse::Ack(ack) if ack.ok => Ok(()),
            EngineResponse::Error { message } => Err(EngineError::EngineSide(message)),
            other => Err(EngineError::EngineSide(format!("unexpected response: {other:?}"))),
        }
    }

    /// Blocking single-job execution against this engine. Serialized per
    /// supervisor: only one job runs against a given engine at a time.
    pub async fn run_job(
        &self,
        job_id: &str,
        input_path: &str,
        output_dir: &str,
        params: std::collections::HashMap<String, String>,
        cancel: CancellationToken,
    ) -> Result<JobStatusMsg, EngineError> {
        let _job_permit = self.job_lock.lock().await;

        self.ensure_ready().await?;

        let mut client = EngineClient::connect(&self.config.socket_path).await?;
        let resp = client
            .call(&EngineRequest::StartJob {
                job_id: job_id.to_string(),
                input_path: input_path.to_string(),
                output_dir: output_dir.to_string(),
                params,
            })
            .await?;
        match resp {
            EngineResponse::Ack(ack) if ack.ok => {}
            EngineResponse::Error { message } => return Err(EngineError::EngineSide(message)),
            other => return Err(EngineError::EngineSide(format!("unexpected response: {other:?}"))),
        }

        client.start_stream(job_id).await?;

        let mut last_status: Option<JobStatusMsg> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.stop_job(job_id).await;
                    return Err(EngineError::Cancelled);
                }
                next = client.recv_status() => {
                    match next? {
                        Some(status) => {
                            let terminal = status.state.is_terminal();
                            last_status = Some(status.clone());
                            if terminal {
                                return Ok(status);
                            }
                        }
                        None => {
                            debug!(job_id, "status stream ended");
                            return match last_status {
                                Some(status) => Ok(status),
                                None => Err(EngineError::EngineSide(
                                    "status stream ended before any status was observed".into(),
                                )),
                            };
                        }
                    }
                }
            }
        }
    }

    /// Best-effort cancellation signal to the engine. Errors are swallowed;
    /// the process-tree kill is the authoritative cancellation path.
    pub async fn stop_job(&self, job_id: &str) {
        if let Err(e) = scriberr_wire::stop_job(&self.config.socket_path, job_id).await {
            debug!(job_id, error = %e, "StopJob RPC failed, relying on process-tree kill");
        }
    }

    /// Query the engine's authoritative loaded-model listing.
    pub async fn loaded_models(&self) -> Result<HashSet<ModelKey>, EngineError> {
        let mut client = EngineClient::connect(&self.config.socket_path).await?;
        match client.call(&EngineRequest::ListLoadedModels).await? {
            EngineResponse::LoadedModels(resp) => Ok(resp.models.into_iter().collect()),
            EngineResponse::Error { message } => Err(EngineError::EngineSide(message)),
            other => Err(EngineError::EngineSide(format!("unexpected response: {other:?}"))),
        }
    }
}
