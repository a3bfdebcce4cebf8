// SPDX-License-Identifier: MIT

//! scriberrd — the Scriberr job-execution daemon.
//!
//! Owns the two engine subprocess supervisors, the Task Queue, and a small
//! Unix-socket operator control surface. The HTTP ingestion API, auth, and
//! everything else in §1's non-goals live in other processes entirely.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use fs2::FileExt;
use scriberr_core::JobId;
use scriberr_daemon::{Config, ControlRequest, ControlResponse, DaemonError};
use scriberr_engine::{EngineConfig, EngineRole, EngineSupervisor, JobProcessor};
use scriberr_queue::{QueueConfig, TaskQueue};
use scriberr_storage::{FileAudioStore, FileJobRepository};
use scriberr_wire::frame;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

type Repository = Arc<FileJobRepository>;
type Queue = TaskQueue<Repository, FileAudioStore>;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("scriberrd: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    let _log_guard = setup_logging(&config)?;

    let _lock_file = acquire_pid_lock(&config)?;

    info!("starting scriberrd, state dir {}", config.state_dir.display());

    let repository: Repository = Arc::new(FileJobRepository::open(&config.backlog_path)?);
    let audio_store = FileAudioStore::new(&config.audio_output_dir);

    let asr = Arc::new(EngineSupervisor::new(EngineConfig::from_env(EngineRole::Asr)));
    let diarization = Arc::new(EngineSupervisor::new(EngineConfig::from_env(
        EngineRole::Diarization,
    )));
    let processor = Arc::new(JobProcessor::new(
        Arc::clone(&repository),
        audio_store,
        asr,
        diarization,
    ));

    let queue: Arc<Queue> = TaskQueue::new(
        Arc::clone(&repository),
        processor,
        QueueConfig::from_env(),
    );
    TaskQueue::start(&queue).await?;

    let listener = bind_control_socket(&config)?;
    info!(
        "listening for operator control commands on {}",
        config.control_socket_path.display()
    );

    let accept_queue = Arc::clone(&queue);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let queue = Arc::clone(&accept_queue);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, queue).await {
                            warn!(error = %e, "control connection ended with an error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "control socket accept failed");
                }
            }
        }
    });

    println!("READY");

    let mut sigterm = signal(SignalKind::terminate()).map_err(DaemonError::Io)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(DaemonError::Io)?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    queue.stop();
    let _ = std::fs::remove_file(&config.control_socket_path);
    info!("scriberrd stopped");
    Ok(())
}

async fn handle_connection(
    mut stream: UnixStream,
    queue: Arc<Queue>,
) -> Result<(), scriberr_wire::ProtocolError> {
    let request: ControlRequest = frame::recv(&mut stream).await?;
    let response = dispatch(request, &queue).await;
    frame::send(&mut stream, &response).await
}

async fn dispatch(request: ControlRequest, queue: &Arc<Queue>) -> ControlResponse {
    match request {
        ControlRequest::Enqueue { job_id } => match queue.enqueue(JobId::new(job_id)) {
            Ok(()) => ControlResponse::Ok,
            Err(e) => ControlResponse::Error {
                message: e.to_string(),
            },
        },
        ControlRequest::Kill { job_id } => match queue.kill(&JobId::new(job_id)).await {
            Ok(()) => ControlResponse::Ok,
            Err(e) => ControlResponse::Error {
                message: e.to_string(),
            },
        },
        ControlRequest::IsRunning { job_id } => ControlResponse::Running {
            running: queue.is_running(&JobId::new(job_id)),
        },
        ControlRequest::Stats => {
            let stats = queue.stats();
            ControlResponse::Stats {
                queue_size: stats.queue_size,
                current_workers: stats.current_workers,
                running_jobs: stats.running_jobs,
            }
        }
    }
}

fn acquire_pid_lock(config: &Config) -> Result<std::fs::File, DaemonError> {
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(DaemonError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

fn bind_control_socket(config: &Config) -> Result<UnixListener, DaemonError> {
    if config.control_socket_path.exists() {
        std::fs::remove_file(&config.control_socket_path)?;
    }
    UnixListener::bind(&config.control_socket_path)
        .map_err(|e| DaemonError::BindFailed(config.control_socket_path.clone(), e))
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(DaemonError::NoStateDir)?,
        config.log_path.file_name().ok_or(DaemonError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
