// SPDX-License-Identifier: MIT

//! scriberrctl — operator control client for scriberrd.
//!
//! Talks to the daemon's Unix control socket (spec.md §2/§6). There is no
//! auto-start here: if the daemon isn't running, that's an error, not
//! something this tool fixes for you.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scriberr_daemon::{Config, ControlRequest, ControlResponse};
use scriberr_wire::frame;
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "scriberrctl", version, about = "Operator control for scriberrd")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a job that has already been written to the repository.
    Enqueue {
        /// Job id to enqueue.
        job_id: String,
    },
    /// Cancel a job, killing its engine subprocess tree if it's running.
    Kill {
        /// Job id to cancel.
        job_id: String,
    },
    /// Report whether a job is currently running.
    IsRunning {
        /// Job id to check.
        job_id: String,
    },
    /// Print queue depth, worker count, and running-job count.
    Stats,
}

impl Commands {
    fn into_request(self) -> ControlRequest {
        match self {
            Commands::Enqueue { job_id } => ControlRequest::Enqueue { job_id },
            Commands::Kill { job_id } => ControlRequest::Kill { job_id },
            Commands::IsRunning { job_id } => ControlRequest::IsRunning { job_id },
            Commands::Stats => ControlRequest::Stats,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("resolving scriberrd state directory")?;

    let response = send_request(&config.control_socket_path, cli.command.into_request()).await?;
    print!("{}", render(response)?);
    Ok(())
}

/// Connect to the control socket and exchange one request/response pair.
async fn send_request(socket_path: &Path, request: ControlRequest) -> Result<ControlResponse> {
    let mut stream = UnixStream::connect(socket_path).await.with_context(|| {
        format!(
            "connecting to {} (is scriberrd running?)",
            socket_path.display()
        )
    })?;

    frame::send(&mut stream, &request)
        .await
        .context("sending request to scriberrd")?;
    frame::recv(&mut stream)
        .await
        .context("reading response from scriberrd")
}

/// Render a response as the text printed to stdout, or an error for
/// `scriberrctl`'s non-zero exit path.
fn render(response: ControlResponse) -> Result<String> {
    Ok(match response {
        ControlResponse::Ok => "ok\n".to_string(),
        ControlResponse::Error { message } => bail!(message),
        ControlResponse::Running { running } => format!("{running}\n"),
        ControlResponse::Stats {
            queue_size,
            current_workers,
            running_jobs,
        } => format!(
            "queue_size: {queue_size}\ncurrent_workers: {current_workers}\nrunning_jobs: {running_jobs}\n"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    async fn serve_once(listener: UnixListener, response: ControlResponse) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request: ControlRequest = frame::recv(&mut stream).await.unwrap();
        frame::send(&mut stream, &response).await.unwrap();
    }

    #[tokio::test]
    async fn round_trips_a_stats_request() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("control.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server = tokio::spawn(serve_once(
            listener,
            ControlResponse::Stats {
                queue_size: 2,
                current_workers: 1,
                running_jobs: 1,
            },
        ));

        let response = send_request(&socket_path, ControlRequest::Stats)
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(
            render(response).unwrap(),
            "queue_size: 2\ncurrent_workers: 1\nrunning_jobs: 1\n"
        );
    }

    #[tokio::test]
    async fn error_response_renders_as_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("control.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server = tokio::spawn(serve_once(
            listener,
            ControlResponse::Error {
                message: "job not found".to_string(),
            },
        ));

        let response = send_request(&socket_path, ControlRequest::Kill {
            job_id: "missing".to_string(),
        })
        .await
        .unwrap();
        server.await.unwrap();

        let err = render(response).unwrap_err();
        assert_eq!(err.to_string(), "job not found");
    }

    #[tokio::test]
    async fn connecting_to_a_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("no-such.sock");
        let err = send_request(&socket_path, ControlRequest::Stats)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connecting to"));
    }
}
