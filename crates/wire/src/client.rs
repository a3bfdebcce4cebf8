// SPDX-License-Identifier: MIT

//! A thin client for the engine RPC surface over a Unix domain socket.

use crate::frame::{self, ProtocolError};
use crate::messages::{EngineRequest, EngineResponse, JobStatusMsg};
use std::path::Path;
use tokio::net::UnixStream;

/// A connected RPC channel to one engine subprocess.
///
/// Unary calls (`GetEngineInfo`, `ListLoadedModels`, `LoadModel`,
/// `UnloadModel`, `StopJob`) send one request frame and read one response
/// frame. `StreamJobStatus` is the one server-streaming call: after sending
/// the request, the caller repeatedly calls [`EngineClient::recv_status`]
/// until it returns `Ok(None)` (stream ended) or a terminal status.
pub struct EngineClient {
    stream: UnixStream,
}

impl EngineClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ProtocolError> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self { stream })
    }

    /// Send a request and read back exactly one response frame. Not valid
    /// for `StreamJobStatus` — use [`Self::start_stream`] instead.
    pub async fn call(&mut self, request: &EngineRequest) -> Result<EngineResponse, ProtocolError> {
        frame::send(&mut self.stream, request).await?;
        frame::recv(&mut self.stream).await
    }

    /// Send a `StreamJobStatus` request; subsequent frames are read with
    /// [`Self::recv_status`].
    pub async fn start_stream(&mut self, job_id: &str) -> Result<(), ProtocolError> {
        frame::send(
            &mut self.stream,
            &EngineRequest::StreamJobStatus {
                job_id: job_id.to_string(),
            },
        )
        .await
    }

    /// Read the next status frame of an in-flight `StreamJobStatus` call.
    ///
    /// Returns `Ok(None)` when the engine sends `StreamEnd` or the
    /// connection is closed without one (both mean "stream ended").
    pub async fn recv_status(&mut self) -> Result<Option<JobStatusMsg>, ProtocolError> {
        let resp: Result<EngineResponse, ProtocolError> = frame::recv(&mut self.stream).await;
        match resp {
            Ok(EngineResponse::JobStatus(status)) => Ok(Some(status)),
            Ok(EngineResponse::StreamEnd) => Ok(None),
            Ok(EngineResponse::Error { message }) => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                message,
            ))),
            Ok(other) => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected response during status stream: {other:?}"),
            ))),
            Err(ProtocolError::ConnectionClosed) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Send a one-off `StopJob` over a fresh connection.
///
/// `StopJob` has to reach the engine while the supervisor's main connection
/// is parked reading an in-flight `StreamJobStatus`, so it can't share that
/// connection. A short-lived connection of its own sidesteps the need for
/// any multiplexing in the wire protocol.
pub async fn stop_job(socket_path: &Path, job_id: &str) -> Result<(), ProtocolError> {
    let mut stream = UnixStream::connect(socket_path).await?;
    frame::send(
        &mut stream,
        &EngineRequest::StopJob {
            job_id: job_id.to_string(),
        },
    )
    .await?;
    let _: EngineResponse = frame::recv(&mut stream).await?;
    Ok(())
}
