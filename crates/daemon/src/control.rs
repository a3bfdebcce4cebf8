// SPDX-License-Identifier: MIT

//! The operator control protocol (spec.md §2's "operator API cancellation
//! travels down from"): `Enqueue`/`Kill`/`IsRunning`/`Stats` over a Unix
//! socket, framed with `scriberr_wire`'s length-prefixed JSON (§6's wire
//! format, reused here since it already solves request/response framing).
//!
//! This is explicitly not the HTTP ingestion API (a non-goal); it exists so
//! an operator tool (`scriberrctl`) can drive the Task Queue without
//! linking against it directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ControlRequest {
    Enqueue { job_id: String },
    Kill { job_id: String },
    IsRunning { job_id: String },
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum ControlResponse {
    Ok,
    Error { message: String },
    Running { running: bool },
    Stats {
        queue_size: usize,
        current_workers: usize,
        running_jobs: usize,
    },
}
