// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon crate, mirroring
//! the teacher's `oj-daemon::env`.

use std::path::PathBuf;

use crate::error::DaemonError;

/// Resolve the state directory: `SCRIBERR_STATE_DIR` > `XDG_STATE_HOME/scriberr`
/// > `~/.local/state/scriberr`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("SCRIBERR_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("scriberr"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/scriberr"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn explicit_override_wins() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SCRIBERR_STATE_DIR", "/tmp/scriberr-test-state");
        assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/scriberr-test-state"));
        std::env::remove_var("SCRIBERR_STATE_DIR");
    }

    #[test]
    fn falls_back_to_xdg_state_home() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("SCRIBERR_STATE_DIR");
        std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
        assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg-state/scriberr"));
        std::env::remove_var("XDG_STATE_HOME");
    }
}
