// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scriberr-queue: the bounded job channel, worker pool, per-job
//! cancellation registry, auto-scaler, and startup recovery (§4.4).

mod config;
mod error;
mod queue;
mod registry;
mod scale;

pub use config::QueueConfig;
pub use error::QueueError;
pub use queue::{
    QueueStats, TaskQueue, CANCELLED_BY_USER_MESSAGE, FORCEFULLY_KILLED_MESSAGE,
    ZOMBIE_KILLED_MESSAGE, ZOMBIE_RESTART_MESSAGE,
};
