// src/subproc/teardown.rs

//! Signal-and-reap helpers.
//!
//! Teardown of a live child follows one fixed escalation:
//! `SIGTERM` → poll for exit until the grace period elapses → `SIGKILL` →
//! blocking reap. A child that has already exited is simply reaped.

use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::errors::{PlaneError, Result};
use crate::types::ExitStatus;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a child gets between `SIGTERM` and `SIGKILL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownPolicy {
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl Default for TeardownPolicy {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TeardownPolicy {
    /// Skip the grace period: `SIGKILL` straight away.
    pub fn immediate() -> Self {
        Self {
            grace_period: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

fn status_from_wait(status: WaitStatus) -> Option<ExitStatus> {
    match status {
        WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
        WaitStatus::Signaled(_, sig, _) => Some(ExitStatus::Signaled(sig)),
        // StillAlive, Stopped, Continued, ptrace events: not reaped.
        _ => None,
    }
}

/// Non-blocking reap. `Ok(None)` while the child is still running.
///
/// `ECHILD` means someone else already reaped it; the status is lost and
/// reported as `Exited(0)`.
pub fn try_reap(pid: Pid) -> Result<Option<ExitStatus>> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => return Ok(status_from_wait(status)),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                debug!(%pid, "child already reaped elsewhere");
                return Ok(Some(ExitStatus::Exited(0)));
            }
            Err(e) => return Err(PlaneError::Wait(e)),
        }
    }
}

/// Blocking reap.
pub fn reap(pid: Pid) -> Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(exit) = status_from_wait(status) {
                    debug!(%pid, ?exit, "child reaped");
                    return Ok(exit);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                debug!(%pid, "child already reaped elsewhere");
                return Ok(ExitStatus::Exited(0));
            }
            Err(e) => return Err(PlaneError::Wait(e)),
        }
    }
}

/// Poll for exit every `poll_interval` until `timeout` elapses.
///
/// `Ok(None)` means the child was still running at the deadline.
pub fn wait_for_exit(
    pid: Pid,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = try_reap(pid)? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(poll_interval.min(deadline - now));
    }
}

/// Send `signal`; a process that no longer exists is not an error.
pub fn send_signal(pid: Pid, signal: Signal) -> Result<()> {
    match kill(pid, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(PlaneError::Signal {
            signal,
            pid: pid.as_raw(),
            source,
        }),
    }
}

/// Terminate and reap `pid` under `policy`.
pub fn terminate(pid: Pid, policy: &TeardownPolicy) -> Result<ExitStatus> {
    if let Some(status) = try_reap(pid)? {
        debug!(%pid, ?status, "child had already exited");
        return Ok(status);
    }

    if !policy.grace_period.is_zero() {
        debug!(%pid, grace = ?policy.grace_period, "sending SIGTERM");
        send_signal(pid, Signal::SIGTERM)?;

        if let Some(status) = wait_for_exit(pid, policy.grace_period, policy.poll_interval)? {
            info!(%pid, ?status, "child exited after SIGTERM");
            return Ok(status);
        }
    }

    warn!(%pid, "child still running after grace period; sending SIGKILL");
    kill_and_reap(pid)
}

/// `SIGKILL` then blocking reap.
pub fn kill_and_reap(pid: Pid) -> Result<ExitStatus> {
    send_signal(pid, Signal::SIGKILL)?;
    let status = reap(pid)?;
    info!(%pid, ?status, "child killed and reaped");
    Ok(status)
}
