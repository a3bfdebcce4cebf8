// SPDX-License-Identifier: MIT

//! In-memory registry of jobs currently owned by a worker, the
//! `RunningJob` of spec §3.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use scriberr_core::JobId;
use tokio_util::sync::CancellationToken;

/// One entry per job between its `PROCESSING` write and its terminal write.
///
/// `process_pid` starts empty and is filled in once the Job Processor's
/// `register_process` callback fires (spec §4.3); `Kill` before that point
/// still cancels the token, it just has no subprocess to hand to the
/// Process Tree Killer yet.
pub struct RunningJob {
    pub cancel: CancellationToken,
    pub process_pid: Arc<Mutex<Option<u32>>>,
    /// Set by `Kill` so the worker loop knows its own terminal write has
    /// already been superseded and must not overwrite it.
    pub force_killed: Arc<AtomicBool>,
}

impl RunningJob {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            process_pid: Arc::new(Mutex::new(None)),
            force_killed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn was_force_killed(&self) -> bool {
        self.force_killed.load(Ordering::SeqCst)
    }
}

/// Registry of jobs currently dequeued and in flight, guarded by a
/// read/write lock per spec §5 ("workers take the write lock to
/// insert/delete; `Kill` and `IsRunning` read or write as needed").
#[derive(Default)]
pub struct Registry {
    jobs: RwLock<HashMap<JobId, RunningJob>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: JobId, entry: RunningJob) {
        self.jobs.write().insert(id, entry);
    }

    pub fn remove(&self, id: &JobId) {
        self.jobs.write().remove(id);
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.jobs.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the entry for `id`, returning `None` if absent.
    pub fn with<T>(&self, id: &JobId, f: impl FnOnce(&RunningJob) -> T) -> Option<T> {
        self.jobs.read().get(id).map(f)
    }
}
