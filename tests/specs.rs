// SPDX-License-Identifier: MIT

#![allow(clippy::unwrap_used, clippy::panic, clippy::expect_used)]

//! End-to-end scenarios driving the real Task Queue, Job Processor, and a
//! genuine `fake-engine` subprocess together, the way they're wired inside
//! `scriberrd`. Component-level invariants (idempotent model loading,
//! readiness timeout, per-component back-pressure/zombie handling) already
//! have focused coverage in `crates/engine/tests` and each crate's own
//! `#[cfg(test)]` modules; these tests exercise the seams between them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scriberr_core::testing::FakeJobRepository;
use scriberr_core::{Job, JobId, JobParameters, JobStatus};
use scriberr_engine::{EngineConfig, EngineRole, EngineSupervisor, JobProcessor};
use scriberr_queue::{QueueConfig, TaskQueue};
use scriberr_storage::FileAudioStore;

fn fake_engine_config(role: EngineRole, socket_path: PathBuf) -> EngineConfig {
    EngineConfig {
        role,
        socket_path,
        command: vec![env!("CARGO_BIN_EXE_fake-engine").to_string()],
        start_timeout: Duration::from_secs(5),
        providers: vec![],
        intra_op_threads: None,
    }
}

fn job_with_plan(id: &str, audio_dir: &std::path::Path, plan: &str) -> Job {
    let mut params = JobParameters::new();
    params.insert("model", "test-model");
    params.insert("_test_plan", plan);
    Job::new(
        JobId::new(id),
        audio_dir.join(format!("{id}.wav")),
        params,
    )
}

async fn wait_until<F: Fn() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Scenario (a): happy path, ASR only.
#[tokio::test]
async fn happy_path_asr_only_reaches_completed() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(FakeJobRepository::new());
    let audio = FileAudioStore::new(dir.path());

    let id = JobId::new("J1");
    repo.insert(job_with_plan("J1", dir.path(), "RUNNING,RUNNING,COMPLETED"));

    let asr = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Asr,
        dir.path().join("asr.sock"),
    )));
    let diar = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Diarization,
        dir.path().join("diar.sock"),
    )));
    let processor = Arc::new(JobProcessor::new(Arc::clone(&repo), audio, asr, diar));
    let queue = TaskQueue::new(
        Arc::clone(&repo),
        processor,
        QueueConfig {
            min_workers: 1,
            max_workers: 1,
            channel_capacity: 4,
            auto_scale: false,
        },
    );
    TaskQueue::start(&queue).await.unwrap();
    queue.enqueue(id.clone()).unwrap();

    let completed = wait_until(Duration::from_secs(5), || {
        repo.snapshot(&id).map(|j| j.status) == Some(JobStatus::Completed)
    })
    .await;
    assert!(completed, "job never reached COMPLETED");

    let job = repo.snapshot(&id).unwrap();
    assert_eq!(job.error_message, None);

    queue.stop();
}

/// Scenario (c): operator kill mid-flight, and property 6 (bounded latency).
#[tokio::test]
async fn operator_kill_mid_flight_terminates_within_budget() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(FakeJobRepository::new());
    let audio = FileAudioStore::new(dir.path());

    let id = JobId::new("J4");
    repo.insert(job_with_plan("J4", dir.path(), "FOREVER"));

    let asr = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Asr,
        dir.path().join("asr.sock"),
    )));
    let diar = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Diarization,
        dir.path().join("diar.sock"),
    )));
    let processor = Arc::new(JobProcessor::new(Arc::clone(&repo), audio, asr, diar));
    let queue = TaskQueue::new(
        Arc::clone(&repo),
        processor,
        QueueConfig {
            min_workers: 1,
            max_workers: 1,
            channel_capacity: 4,
            auto_scale: false,
        },
    );
    TaskQueue::start(&queue).await.unwrap();
    queue.enqueue(id.clone()).unwrap();

    let running = wait_until(Duration::from_secs(5), || queue.is_running(&id)).await;
    assert!(running, "job never started running");

    let start = tokio::time::Instant::now();
    queue.kill(&id).await.unwrap();

    let terminal = wait_until(Duration::from_millis(500), || {
        !queue.is_running(&id)
            && repo.snapshot(&id).map(|j| j.status) == Some(JobStatus::Failed)
    })
    .await;
    assert!(terminal, "kill did not reach a terminal state in time");
    assert!(start.elapsed() < Duration::from_millis(500));

    let job = repo.snapshot(&id).unwrap();
    assert_eq!(
        job.error_message.as_deref(),
        Some(scriberr_queue::FORCEFULLY_KILLED_MESSAGE)
    );

    queue.stop();
}

/// Property 3: at most one `RunJob` executes against a given engine
/// supervisor at a time — two jobs sharing one ASR engine serialize rather
/// than run concurrently.
#[tokio::test]
async fn jobs_sharing_an_engine_serialize_on_it() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("asr.sock");
    let supervisor = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Asr,
        socket_path,
    )));

    let mut params_a = HashMap::new();
    params_a.insert("_test_plan".to_string(), "RUNNING,COMPLETED".to_string());
    let mut params_b = params_a.clone();
    params_b.insert("_test_plan".to_string(), "RUNNING,COMPLETED".to_string());

    let sup_a = Arc::clone(&supervisor);
    let job_a = tokio::spawn(async move {
        sup_a
            .run_job(
                "a",
                "/tmp/a.wav",
                "/tmp/out-a",
                params_a,
                tokio_util::sync::CancellationToken::new(),
            )
            .await
    });
    let sup_b = Arc::clone(&supervisor);
    let job_b = tokio::spawn(async move {
        sup_b
            .run_job(
                "b",
                "/tmp/b.wav",
                "/tmp/out-b",
                params_b,
                tokio_util::sync::CancellationToken::new(),
            )
            .await
    });

    let (result_a, result_b) = tokio::join!(job_a, job_b);
    assert_eq!(
        result_a.unwrap().unwrap().state,
        scriberr_wire::JobState::Completed
    );
    assert_eq!(
        result_b.unwrap().unwrap().state,
        scriberr_wire::JobState::Completed
    );
}

/// Scenario (b), exercised against the real file-backed repository rather
/// than the in-memory fake: a crash-time `PROCESSING` job is reset to
/// `FAILED` and a `PENDING` job is picked up, both across a process-boundary
/// stand-in (reopening the backlog file fresh).
#[tokio::test]
async fn restart_recovery_against_a_file_backed_repository() {
    let dir = tempfile::tempdir().unwrap();
    let backlog_path = dir.path().join("backlog.json");

    {
        let repo = scriberr_storage::FileJobRepository::open(&backlog_path).unwrap();
        let mut zombie = job_with_plan("J2", dir.path(), "COMPLETED");
        zombie.status = JobStatus::Processing;
        repo.insert(zombie).unwrap();
        repo.insert(job_with_plan("J3", dir.path(), "COMPLETED"))
            .unwrap();
    }

    let repo = Arc::new(scriberr_storage::FileJobRepository::open(&backlog_path).unwrap());
    let audio = FileAudioStore::new(dir.path());
    let asr = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Asr,
        dir.path().join("asr.sock"),
    )));
    let diar = Arc::new(EngineSupervisor::new(fake_engine_config(
        EngineRole::Diarization,
        dir.path().join("diar.sock"),
    )));
    let processor = Arc::new(JobProcessor::new(Arc::clone(&repo), audio, asr, diar));
    let queue = TaskQueue::new(
        Arc::clone(&repo),
        processor,
        QueueConfig {
            min_workers: 1,
            max_workers: 1,
            channel_capacity: 4,
            auto_scale: false,
        },
    );
    TaskQueue::start(&queue).await.unwrap();

    // J2 is reset synchronously inside `start()`, before it returns.
    let j2 = repo.snapshot(&JobId::new("J2")).unwrap();
    assert_eq!(j2.status, JobStatus::Failed);
    assert_eq!(
        j2.error_message.as_deref(),
        Some(scriberr_queue::ZOMBIE_RESTART_MESSAGE)
    );

    let j3_completed = wait_until(Duration::from_secs(5), || {
        repo.snapshot(&JobId::new("J3")).map(|j| j.status) == Some(JobStatus::Completed)
    })
    .await;
    assert!(j3_completed, "recovered pending job never completed");

    queue.stop();
}
