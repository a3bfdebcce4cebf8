// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scriberr-engine: supervises the ASR and diarization engine subprocesses
//! and drives one queued job through them.

pub mod config;
pub mod error;
pub mod kill;
pub mod processor;
pub mod supervisor;

pub use config::{EngineConfig, EngineRole};
pub use error::EngineError;
pub use kill::kill_tree;
pub use processor::JobProcessor;
pub use supervisor::EngineSupervisor;
