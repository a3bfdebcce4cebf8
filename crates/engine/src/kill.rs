// SPDX-License-Identifier: MIT

//! Process Tree Killer: terminate an engine subprocess and everything it
//! spawned.
//!
//! Callers must launch the child in its own process group (on Unix, via
//! `Command::process_group(0)`) so the negated PID addresses the whole tree.

use std::time::Duration;

/// Grace period between the initial termination signal and the fatal
/// follow-up, on platforms that distinguish the two.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Terminate the process group rooted at `pid`, falling back to killing just
/// the top-level process if the group signal can't be delivered.
///
/// Always returns; a failed kill attempt is not surfaced as a hard error
/// because the caller proceeds to mark the job failed regardless (spec
/// §4.1: "returning an error is informational only").
#[cfg(unix)]
pub fn kill_tree(pid: u32) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => {
            let pid_i32 = pid as i32;
            std::thread::spawn(move || {
                std::thread::sleep(KILL_GRACE_PERIOD);
                let pgid = Pid::from_raw(pid_i32);
                if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                    tracing::debug!(pid = pid_i32, error = %e, "SIGKILL to process group failed");
                }
            });
        }
        Err(e) => {
            tracing::warn!(pid, error = %e, "SIGTERM to process group failed, falling back to direct kill");
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                tracing::warn!(pid, error = %e, "direct SIGKILL fallback also failed");
            }
        }
    }
}

/// Best-effort top-level-only kill. Not a true tree kill — acceptable per
/// spec §4.1's explicit Windows carve-out. Deliberately omits `taskkill`'s
/// `/T` flag, which would recurse into children.
#[cfg(windows)]
pub fn kill_tree(pid: u32) {
    if let Err(e) = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .output()
    {
        tracing::warn!(pid, error = %e, "taskkill failed");
    }
}

#[cfg(not(any(unix, windows)))]
pub fn kill_tree(pid: u32) {
    tracing::warn!(pid, "process tree kill not supported on this platform");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    #[test]
    fn kills_a_real_child_process_group() {
        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id();

        kill_tree(pid);

        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
