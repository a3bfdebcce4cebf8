// SPDX-License-Identifier: MIT

//! Daemon configuration: where state lives on disk.

use std::path::PathBuf;

use crate::env;
use crate::error::DaemonError;

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub control_socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub backlog_path: PathBuf,
    pub audio_output_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            control_socket_path: state_dir.join("control.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            backlog_path: state_dir.join("backlog.json"),
            audio_output_dir: state_dir.join("output"),
            state_dir,
        })
    }
}
