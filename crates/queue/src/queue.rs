// SPDX-License-Identifier: MIT

//! The Task Queue: bounded channel, worker pool, auto-scaler, and startup
//! recovery, per spec §4.4.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scriberr_core::{AudioStore, Clock, JobId, JobRepository, JobStatus, SystemClock};
use scriberr_engine::{EngineError, JobProcessor};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::registry::{Registry, RunningJob};
use crate::scale::{self, ScaleDecision};

const SCALER_EVAL_INTERVAL: Duration = Duration::from_secs(30);
const SCALER_COOLDOWN: Duration = Duration::from_secs(60);

pub const ZOMBIE_RESTART_MESSAGE: &str = "Job interrupted by server restart";
pub const CANCELLED_BY_USER_MESSAGE: &str = "Job was cancelled by user";
pub const ZOMBIE_KILLED_MESSAGE: &str = "Job was forcefully terminated by user (zombie process)";
pub const FORCEFULLY_KILLED_MESSAGE: &str = "Job was forcefully terminated by user";

/// A read-only snapshot of queue occupancy, exposed over the daemon's
/// operator control socket.
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub queue_size: usize,
    pub current_workers: usize,
    pub running_jobs: usize,
}

pub struct TaskQueue<R, A> {
    repository: R,
    processor: Arc<JobProcessor<R, A>>,
    config: QueueConfig,
    tx: mpsc::Sender<JobId>,
    rx: AsyncMutex<mpsc::Receiver<JobId>>,
    registry: Registry,
    root_cancel: CancellationToken,
    current_workers: AtomicUsize,
    target_workers: AtomicUsize,
    clock: Arc<dyn Clock>,
    next_worker_id: AtomicUsize,
}

impl<R, A> TaskQueue<R, A>
where
    R: JobRepository + Clone + Send + Sync + 'static,
    A: AudioStore + Send + Sync + 'static,
{
    pub fn new(repository: R, processor: Arc<JobProcessor<R, A>>, config: QueueConfig) -> Arc<Self> {
        Self::with_clock(repository, processor, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: R,
        processor: Arc<JobProcessor<R, A>>,
        config: QueueConfig,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        Arc::new(Self {
            repository,
            processor,
            target_workers: AtomicUsize::new(config.min_workers),
            config,
            tx,
            rx: AsyncMutex::new(rx),
            registry: Registry::new(),
            root_cancel: CancellationToken::new(),
            current_workers: AtomicUsize::new(0),
            clock,
            next_worker_id: AtomicUsize::new(0),
        })
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queue_size: self.queue_depth(),
            current_workers: self.current_workers.load(Ordering::SeqCst),
            running_jobs: self.registry.len(),
        }
    }

    fn queue_depth(&self) -> usize {
        self.config
            .channel_capacity
            .saturating_sub(self.tx.capacity())
    }

    /// Zombie reset, pending recovery, then launch the worker pool (and the
    /// auto-scaler, if enabled).
    ///
    /// Takes `queue: &Arc<Self>` rather than a `self` receiver since
    /// `&Arc<Self>` isn't a blessed receiver type; only bare `Arc<Self>` is.
    pub async fn start(queue: &Arc<Self>) -> Result<(), QueueError> {
        queue.reset_zombies().await;
        queue.recover_pending().await;

        for _ in 0..queue.config.min_workers {
            Self::spawn_worker(queue);
        }

        if queue.config.auto_scale {
            Self::spawn_scaler(queue);
        }

        Ok(())
    }

    async fn reset_zombies(&self) {
        let zombies = match self
            .repository
            .list_ids_by_status(JobStatus::Processing)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to list zombie jobs at startup");
                return;
            }
        };
        for id in zombies {
            if let Err(e) = self
                .repository
                .set_status(&id, JobStatus::Failed, Some(ZOMBIE_RESTART_MESSAGE.to_string()))
                .await
            {
                warn!(job_id = %id, error = %e, "failed to reset zombie job");
            }
        }
    }

    async fn recover_pending(&self) {
        let pending = match self.repository.list_ids_by_status(JobStatus::Pending).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to list pending jobs at startup");
                return;
            }
        };
        for id in pending {
            if self.tx.try_send(id.clone()).is_err() {
                debug!(job_id = %id, "pending recovery: channel full, leaving for next enqueue/restart");
            }
        }
    }

    /// Non-blocking push per spec §4.4.
    pub fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        if self.root_cancel.is_cancelled() {
            return Err(QueueError::QueueShuttingDown);
        }
        self.tx.try_send(job_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => QueueError::QueueShuttingDown,
        })
    }

    pub fn is_running(&self, job_id: &JobId) -> bool {
        self.registry.is_running(job_id)
    }

    /// Operator-initiated forced termination, spec §4.4.
    pub async fn kill(&self, job_id: &JobId) -> Result<(), QueueError> {
        let found = self.registry.with(job_id, |entry| {
            entry.force_killed.store(true, Ordering::SeqCst);
            entry.cancel.cancel();
            *entry.process_pid.lock()
        });

        let Some(pid) = found else {
            return self.kill_zombie(job_id).await;
        };

        if let Some(pid) = pid {
            scriberr_engine::kill_tree(pid);
        }

        if let Err(e) = self
            .repository
            .set_status(
                job_id,
                JobStatus::Failed,
                Some(FORCEFULLY_KILLED_MESSAGE.to_string()),
            )
            .await
        {
            warn!(job_id = %job_id, error = %e, "failed to persist forced-kill terminal state");
        }

        Ok(())
    }

    async fn kill_zombie(&self, job_id: &JobId) -> Result<(), QueueError> {
        let job = self
            .repository
            .get(job_id)
            .await
            .map_err(|_| QueueError::JobNotRunning)?;

        if job.status != JobStatus::Processing {
            return Err(QueueError::JobNotRunning);
        }

        if let Err(e) = self
            .repository
            .set_status(
                job_id,
                JobStatus::Failed,
                Some(ZOMBIE_KILLED_MESSAGE.to_string()),
            )
            .await
        {
            warn!(job_id = %job_id, error = %e, "failed to persist zombie-kill terminal state");
        }
        Ok(())
    }

    /// Cancel the root token. The job channel is left open per spec §4.4
    /// ("closing is unsafe while enqueues may race").
    pub fn stop(&self) {
        self.root_cancel.cancel();
    }

    fn spawn_worker(queue: &Arc<Self>) {
        let worker_id = queue.next_worker_id.fetch_add(1, Ordering::SeqCst);
        queue.current_workers.fetch_add(1, Ordering::SeqCst);
        let queue = Arc::clone(queue);
        tokio::spawn(async move {
            queue.worker_loop(worker_id).await;
        });
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "worker started");
        loop {
            let current = self.current_workers.load(Ordering::SeqCst);
            let target = self.target_workers.load(Ordering::SeqCst);
            if current > target
                && self
                    .current_workers
                    .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                debug!(worker_id, "worker exiting, scaled down");
                return;
            }

            let job_id = {
                let mut rx = self.rx.lock().await;
                tokio::select! {
                    biased;
                    _ = self.root_cancel.cancelled() => {
                        self.current_workers.fetch_sub(1, Ordering::SeqCst);
                        debug!(worker_id, "worker exiting, queue stopped");
                        return;
                    }
                    next = rx.recv() => match next {
                        Some(id) => id,
                        None => {
                            self.current_workers.fetch_sub(1, Ordering::SeqCst);
                            return;
                        }
                    },
                }
            };

            self.run_one(job_id).await;
        }
    }

    async fn run_one(&self, job_id: JobId) {
        if let Err(e) = self
            .repository
            .set_status(&job_id, JobStatus::Processing, None)
            .await
        {
            warn!(job_id = %job_id, error = %e, "failed to persist PROCESSING transition");
        }

        let cancel = self.root_cancel.child_token();
        let entry = RunningJob::new(cancel.clone());
        let pid_slot = Arc::clone(&entry.process_pid);
        let force_killed = Arc::clone(&entry.force_killed);
        self.registry.insert(job_id.clone(), entry);

        let result = self
            .processor
            .process_job(&job_id, cancel, move |pid| {
                *pid_slot.lock() = Some(pid);
            })
            .await;

        self.registry.remove(&job_id);

        if force_killed.load(Ordering::SeqCst) {
            // `kill()` already wrote the terminal state.
            return;
        }

        match result {
            Ok(transcript) => {
                if let Err(e) = self.repository.set_transcript(&job_id, transcript).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist transcript");
                }
                if let Err(e) = self
                    .repository
                    .set_status(&job_id, JobStatus::Completed, None)
                    .await
                {
                    warn!(job_id = %job_id, error = %e, "failed to persist COMPLETED transition");
                }
            }
            Err(EngineError::Cancelled) => {
                if let Err(e) = self
                    .repository
                    .set_status(
                        &job_id,
                        JobStatus::Failed,
                        Some(CANCELLED_BY_USER_MESSAGE.to_string()),
                    )
                    .await
                {
                    warn!(job_id = %job_id, error = %e, "failed to persist cancellation");
                }
            }
            Err(other) => {
                if let Err(e) = self
                    .repository
                    .set_status(&job_id, JobStatus::Failed, Some(other.to_string()))
                    .await
                {
                    warn!(job_id = %job_id, error = %e, "failed to persist FAILED transition");
                }
            }
        }
    }

    fn spawn_scaler(queue: &Arc<Self>) {
        let queue = Arc::clone(queue);
        tokio::spawn(async move {
            queue.scaler_loop().await;
        });
    }

    async fn scaler_loop(self: Arc<Self>) {
        let mut last_change = self.clock.now();
        loop {
            tokio::select! {
                _ = self.root_cancel.cancelled() => return,
                _ = tokio::time::sleep(SCALER_EVAL_INTERVAL) => {}
            }

            let now = self.clock.now();
            let cooldown_elapsed = now.duration_since(last_change) >= SCALER_COOLDOWN;
            let decision = scale::decide(
                self.queue_depth(),
                self.registry.len(),
                self.current_workers.load(Ordering::SeqCst),
                self.config.min_workers,
                self.config.max_workers,
                cooldown_elapsed,
            );

            match decision {
                ScaleDecision::Up => {
                    info!("auto-scaler: scaling up");
                    self.target_workers.fetch_add(1, Ordering::SeqCst);
                    Self::spawn_worker(&self);
                    last_change = now;
                }
                ScaleDecision::Down => {
                    info!("auto-scaler: scaling down");
                    self.target_workers.fetch_sub(1, Ordering::SeqCst);
                    last_change = now;
                }
                ScaleDecision::Hold => {}
            }
        }
    }
}
