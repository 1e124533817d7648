// src/types.rs

use std::str::FromStr;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use serde::Deserialize;

/// Default read size per chunk, matching glibc's `BUFSIZ`.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default pause between re-armed reads when following a descriptor.
pub const DEFAULT_FOLLOW_INTERVAL: Duration = Duration::from_millis(250);

/// What the data callback wants the reader to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadControl {
    #[default]
    Continue,
    /// End the read loop. Not an error: `on_done` still reports status 0.
    Stop,
}

impl ReadControl {
    pub fn is_stop(self) -> bool {
        matches!(self, ReadControl::Stop)
    }
}

/// Why the reader loop ended, as handed to `on_done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// Clean end-of-stream.
    Eof,
    /// The data callback returned [`ReadControl::Stop`] or requested destroy.
    Stopped,
    /// `read` failed with this errno.
    ReadError(Errno),
    /// The plane was destroyed from another thread while the reader waited.
    Cancelled,
}

impl DoneReason {
    /// Integer status: `0` for normal completion, otherwise an errno value.
    pub fn code(self) -> i32 {
        match self {
            DoneReason::Eof | DoneReason::Stopped => 0,
            DoneReason::ReadError(errno) => errno as i32,
            DoneReason::Cancelled => Errno::ECANCELED as i32,
        }
    }

    pub fn is_success(self) -> bool {
        self.code() == 0
    }
}

/// Lifecycle of an FdPlane's owned resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestroyState {
    Active = 0,
    /// Destroy was requested on the reader thread; the reader closes the fd
    /// on its way out.
    DestroyRequested = 1,
    Destroyed = 2,
}

impl DestroyState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => DestroyState::Active,
            1 => DestroyState::DestroyRequested,
            _ => DestroyState::Destroyed,
        }
    }
}

/// Result of a destroy request made from inside a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The request was recorded; teardown runs when the reader exits.
    Deferred,
    /// A previous request is already pending or done.
    AlreadyRequested,
}

/// Behaviour on end-of-stream.
///
/// - `Off`: every EOF is terminal (default).
/// - `On`: EOF is treated as transient. The reader sleeps for `interval`
///   (interruptible by destroy) and reads again, like `tail -f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    #[default]
    Off,
    On { interval: Duration },
}

impl FollowMode {
    pub fn enabled() -> Self {
        FollowMode::On {
            interval: DEFAULT_FOLLOW_INTERVAL,
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, FollowMode::On { .. })
    }
}

impl From<bool> for FollowMode {
    fn from(follow: bool) -> Self {
        if follow { FollowMode::enabled() } else { FollowMode::Off }
    }
}

/// Which child streams are routed into the capture pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capture {
    /// stdout and stderr share the pipe.
    #[default]
    Combined,
    /// Only stdout; stderr stays inherited from the parent.
    Stdout,
}

impl FromStr for Capture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "combined" => Ok(Capture::Combined),
            "stdout" => Ok(Capture::Stdout),
            other => Err(format!(
                "invalid capture mode: {other} (expected \"combined\" or \"stdout\")"
            )),
        }
    }
}

/// Exit status of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Exited(code) => Some(*code),
            ExitStatus::Signaled(_) => None,
        }
    }

    /// Shell-style status: the exit code, or `128 + signal`.
    pub fn shell_code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Signaled(sig) => 128 + *sig as i32,
        }
    }
}
