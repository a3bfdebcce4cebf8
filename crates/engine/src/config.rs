// SPDX-License-Identifier: MIT

//! Per-role engine configuration, resolved from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Which half of the transcription pipeline a supervisor drives. Each role
/// gets its own subprocess, socket, and environment variable prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRole {
    Asr,
    Diarization,
}

impl EngineRole {
    pub fn env_prefix(self) -> &'static str {
        match self {
            EngineRole::Asr => "ASR",
            EngineRole::Diarization => "DIAR",
        }
    }

    fn default_socket(self) -> &'static str {
        match self {
            EngineRole::Asr => "/run/scriberr/engines/asr.sock",
            EngineRole::Diarization => "/run/scriberr/engines/diar.sock",
        }
    }
}

/// Immutable configuration for one [`EngineRole`]'s supervisor.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub role: EngineRole,
    pub socket_path: PathBuf,
    pub command: Vec<String>,
    pub start_timeout: Duration,
    pub providers: Vec<String>,
    pub intra_op_threads: Option<u32>,
}

impl EngineConfig {
    /// Resolve configuration for `role` from its `ASR_*`/`DIAR_*` environment
    /// variables, falling back to built-in defaults.
    pub fn from_env(role: EngineRole) -> Self {
        let prefix = role.env_prefix();

        let socket_path = std::env::var(format!("{prefix}_ENGINE_SOCKET"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(role.default_socket()));

        let command = std::env::var(format!("{prefix}_ENGINE_CMD"))
            .ok()
            .and_then(|s| shlex::split(&s))
            .unwrap_or_default();

        let start_timeout = std::env::var(format!("{prefix}_ENGINE_START_TIMEOUT_MS"))
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(15));

        let providers = std::env::var(format!("{prefix}_ENGINE_PROVIDERS"))
            .ok()
            .map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
            .unwrap_or_default();

        let intra_op_threads = std::env::var(format!("{prefix}_ENGINE_INTRA_OP_THREADS"))
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0);

        Self {
            role,
            socket_path,
            command,
            start_timeout,
            providers,
            intra_op_threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable tests must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        for var in [
            "ASR_ENGINE_SOCKET",
            "ASR_ENGINE_CMD",
            "ASR_ENGINE_START_TIMEOUT_MS",
            "ASR_ENGINE_PROVIDERS",
            "ASR_ENGINE_INTRA_OP_THREADS",
        ] {
            std::env::remove_var(var);
        }
        let cfg = EngineConfig::from_env(EngineRole::Asr);
        assert_eq!(cfg.socket_path, PathBuf::from("/run/scriberr/engines/asr.sock"));
        assert_eq!(cfg.start_timeout, Duration::from_secs(15));
        assert!(cfg.command.is_empty());
        assert!(cfg.providers.is_empty());
        assert_eq!(cfg.intra_op_threads, None);
    }

    #[test]
    fn parses_quoted_command_and_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DIAR_ENGINE_SOCKET", "/tmp/diar.sock");
        std::env::set_var("DIAR_ENGINE_CMD", "diar-engine --flag \"two words\"");
        std::env::set_var("DIAR_ENGINE_START_TIMEOUT_MS", "200");
        std::env::set_var("DIAR_ENGINE_PROVIDERS", "cpu, cuda");
        std::env::set_var("DIAR_ENGINE_INTRA_OP_THREADS", "4");

        let cfg = EngineConfig::from_env(EngineRole::Diarization);
        assert_eq!(cfg.socket_path, PathBuf::from("/tmp/diar.sock"));
        assert_eq!(
            cfg.command,
            vec!["diar-engine", "--flag", "two words"]
        );
        assert_eq!(cfg.start_timeout, Duration::from_millis(200));
        assert_eq!(cfg.providers, vec!["cpu", "cuda"]);
        assert_eq!(cfg.intra_op_threads, Some(4));

        for var in [
            "DIAR_ENGINE_SOCKET",
            "DIAR_ENGINE_CMD",
            "DIAR_ENGINE_START_TIMEOUT_MS",
            "DIAR_ENGINE_PROVIDERS",
            "DIAR_ENGINE_INTRA_OP_THREADS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn zero_intra_op_threads_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ASR_ENGINE_INTRA_OP_THREADS", "0");
        let cfg = EngineConfig::from_env(EngineRole::Asr);
        assert_eq!(cfg.intra_op_threads, None);
        std::env::remove_var("ASR_ENGINE_INTRA_OP_THREADS");
    }
}
