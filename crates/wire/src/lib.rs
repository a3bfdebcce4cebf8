// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scriberr-wire: the length-prefixed JSON RPC surface spoken between a
//! daemon's `EngineSupervisor` and an ASR/diarization engine subprocess.
//!
//! [`frame`] is the transport (length-prefix + JSON). [`messages`] defines
//! the request/response payloads. [`client`] is the supervisor side,
//! [`server`] is the engine side — both real engine binaries and test
//! fixtures implement [`server::EngineBehavior`].

pub mod client;
pub mod frame;
pub mod messages;
pub mod server;

pub use client::{stop_job, EngineClient};
pub use frame::ProtocolError;
pub use messages::{
    Ack, EngineInfo, EngineRequest, EngineResponse, JobState, JobStatusMsg,
    ListLoadedModelsResponse, ModelKey, ModelSpec,
};
pub use server::{bind, serve, EngineBehavior};
